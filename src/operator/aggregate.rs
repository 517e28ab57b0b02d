use std::{collections::HashMap, fmt};

use super::OpIterator;
use crate::{
    error::{ErrorKind, SmallError},
    storage::{
        schema::{Field, Schema, Type},
        tuple::{Cell, Tuple},
    },
    types::SmallResult,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateOp {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateOp {
    /// The state of a group before any value is seen.
    pub fn init(&self) -> Accumulator {
        match self {
            AggregateOp::Count => Accumulator::Count(0),
            AggregateOp::Sum => Accumulator::Sum(0),
            AggregateOp::Avg => Accumulator::Avg { sum: 0, count: 0 },
            AggregateOp::Min => Accumulator::Min(i64::MAX),
            AggregateOp::Max => Accumulator::Max(i64::MIN),
        }
    }

    /// `Count` works on every type, the others only on int64.
    pub fn supports(&self, t: &Type) -> bool {
        match self {
            AggregateOp::Count => true,
            _ => *t == Type::Int64,
        }
    }
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            AggregateOp::Count => "count",
            AggregateOp::Sum => "sum",
            AggregateOp::Avg => "avg",
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
        };
        write!(f, "{}", name)
    }
}

/// The running state of one group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Accumulator {
    Count(i64),
    Sum(i64),
    Avg { sum: i64, count: i64 },
    Min(i64),
    Max(i64),
}

impl Accumulator {
    /// Fold one value into the state, fails if the running sum or count
    /// overflows int64.
    pub fn combine(self, value: &Cell) -> Result<Accumulator, SmallError> {
        let acc = match self {
            Accumulator::Count(n) => Accumulator::Count(checked_add(n, 1)?),
            Accumulator::Sum(s) => Accumulator::Sum(checked_add(s, value.get_int64()?)?),
            Accumulator::Avg { sum, count } => Accumulator::Avg {
                sum: checked_add(sum, value.get_int64()?)?,
                count: checked_add(count, 1)?,
            },
            Accumulator::Min(m) => Accumulator::Min(m.min(value.get_int64()?)),
            Accumulator::Max(m) => Accumulator::Max(m.max(value.get_int64()?)),
        };
        Ok(acc)
    }

    /// The aggregate value, the average is rounded toward zero.
    pub fn finish(&self) -> i64 {
        match self {
            Accumulator::Count(v)
            | Accumulator::Sum(v)
            | Accumulator::Min(v)
            | Accumulator::Max(v) => *v,
            Accumulator::Avg { sum, count } => {
                if *count == 0 {
                    0
                } else {
                    sum / count
                }
            }
        }
    }
}

fn checked_add(a: i64, b: i64) -> Result<i64, SmallError> {
    a.checked_add(b).ok_or_else(|| {
        SmallError::new(&format!("aggregate overflows int64: {} + {}", a, b))
    })
}

/// Computes an aggregate over one field of the child, optionally
/// grouped by another field.
///
/// The child is fully consumed on `open`. Output tuples are
/// `(group, value)` with grouping, `(value)` without, groups come out
/// in the order they were first seen.
pub struct Aggregate {
    child: Box<dyn OpIterator>,
    agg_field: usize,
    group_field: Option<usize>,
    op: AggregateOp,

    schema: Schema,

    results: Vec<Tuple>,
    cursor: usize,
}

impl Aggregate {
    pub fn new(
        child: Box<dyn OpIterator>,
        agg_field: usize,
        group_field: Option<usize>,
        op: AggregateOp,
    ) -> Result<Self, SmallError> {
        let child_schema = child.get_schema();

        let check_field = |i: usize| -> Result<Field, SmallError> {
            child_schema.get_fields().get(i).cloned().ok_or_else(|| {
                SmallError::with_kind(
                    ErrorKind::SchemaMismatch,
                    &format!("field {} out of range, schema: {}", i, child_schema),
                )
            })
        };

        let agg = check_field(agg_field)?;
        if !op.supports(&agg.get_type()) {
            return Err(SmallError::with_kind(
                ErrorKind::SchemaMismatch,
                &format!("{} is not supported on {} of type {}", op, agg.name, agg.t),
            ));
        }

        let mut fields = Vec::new();
        if let Some(i) = group_field {
            fields.push(check_field(i)?);
        }
        fields.push(Field::new(&format!("{}({})", op, agg.name), Type::Int64));

        Ok(Self {
            child,
            agg_field,
            group_field,
            op,
            schema: Schema::new(fields),
            results: Vec::new(),
            cursor: 0,
        })
    }

    fn compute(&mut self) -> SmallResult {
        // groups in order of first appearance
        let mut groups: Vec<(Option<Cell>, Accumulator)> = Vec::new();
        let mut index: HashMap<Option<Cell>, usize> = HashMap::new();

        while let Some(tuple) = self.child.next()? {
            let key = self.group_field.map(|i| tuple.get_cell(i));
            let value = tuple.get_cell(self.agg_field);

            let pos = match index.get(&key) {
                Some(pos) => *pos,
                None => {
                    groups.push((key.clone(), self.op.init()));
                    index.insert(key, groups.len() - 1);
                    groups.len() - 1
                }
            };
            groups[pos].1 = groups[pos].1.combine(&value)?;
        }

        self.results = groups
            .into_iter()
            .map(|(key, acc)| {
                let value = Cell::new_int64(acc.finish());
                match key {
                    Some(k) => Tuple::new(&[k, value]),
                    None => Tuple::new(&[value]),
                }
            })
            .collect();
        self.cursor = 0;
        Ok(())
    }
}

impl OpIterator for Aggregate {
    fn open(&mut self) -> SmallResult {
        self.child.open()?;
        self.compute()
    }

    fn next(&mut self) -> SmallResult<Option<Tuple>> {
        let tuple = self.results.get(self.cursor).cloned();
        if tuple.is_some() {
            self.cursor += 1;
        }
        Ok(tuple)
    }

    fn rewind(&mut self) -> SmallResult {
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
        self.results.clear();
        self.cursor = 0;
    }

    fn get_schema(&self) -> Schema {
        self.schema.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// An operator over a fixed list of tuples.
    struct Rows {
        schema: Schema,
        rows: Vec<Tuple>,
        cursor: Option<usize>,
    }

    impl OpIterator for Rows {
        fn open(&mut self) -> SmallResult {
            self.cursor = Some(0);
            Ok(())
        }

        fn next(&mut self) -> SmallResult<Option<Tuple>> {
            let cursor = match self.cursor.as_mut() {
                Some(c) => c,
                None => return Ok(None),
            };
            let row = self.rows.get(*cursor).cloned();
            *cursor += 1;
            Ok(row)
        }

        fn rewind(&mut self) -> SmallResult {
            self.open()
        }

        fn close(&mut self) {
            self.cursor = None;
        }

        fn get_schema(&self) -> Schema {
            self.schema.clone()
        }
    }

    fn rows(pairs: &[(i64, i64)]) -> Box<dyn OpIterator> {
        Box::new(Rows {
            schema: Schema::small_int_schema(2, ""),
            rows: pairs
                .iter()
                .map(|(g, v)| Tuple::new(&[Cell::new_int64(*g), Cell::new_int64(*v)]))
                .collect(),
            cursor: None,
        })
    }

    fn collect(op: &mut dyn OpIterator) -> Vec<Tuple> {
        let mut out = Vec::new();
        while let Some(t) = op.next().unwrap() {
            out.push(t);
        }
        out
    }

    #[test]
    fn test_accumulator() {
        let values: Vec<Cell> = vec![4, 1, 7].into_iter().map(Cell::new_int64).collect();
        let run = |op: AggregateOp| {
            values
                .iter()
                .fold(op.init(), |acc, v| acc.combine(v).unwrap())
                .finish()
        };

        assert_eq!(run(AggregateOp::Count), 3);
        assert_eq!(run(AggregateOp::Sum), 12);
        assert_eq!(run(AggregateOp::Avg), 4);
        assert_eq!(run(AggregateOp::Min), 1);
        assert_eq!(run(AggregateOp::Max), 7);
    }

    #[test]
    fn test_avg_keeps_sum_and_count() {
        let acc = AggregateOp::Avg
            .init()
            .combine(&Cell::new_int64(1))
            .unwrap()
            .combine(&Cell::new_int64(2))
            .unwrap();
        assert_eq!(acc, Accumulator::Avg { sum: 3, count: 2 });
        assert_eq!(acc.finish(), 1);
    }

    #[test]
    fn test_sum_overflow() {
        let err = Accumulator::Sum(i64::MAX)
            .combine(&Cell::new_int64(1))
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Internal);

        let child = rows(&[(0, i64::MAX), (0, 1)]);
        let mut agg = Aggregate::new(child, 1, None, AggregateOp::Sum).unwrap();
        assert!(agg.open().is_err());

        // negative values bring the sum back in range
        let child = rows(&[(0, i64::MAX), (0, -1), (0, 1)]);
        let mut agg = Aggregate::new(child, 1, None, AggregateOp::Avg).unwrap();
        agg.open().unwrap();
        assert_eq!(
            collect(&mut agg),
            vec![Tuple::new(&[Cell::new_int64(i64::MAX / 3)])]
        );
    }

    #[test]
    fn test_grouped() {
        let child = rows(&[(1, 10), (2, 5), (1, 20), (2, 7), (3, 1)]);
        let mut agg = Aggregate::new(child, 1, Some(0), AggregateOp::Sum).unwrap();
        agg.open().unwrap();

        let out = collect(&mut agg);
        assert_eq!(
            out,
            vec![
                Tuple::new(&[Cell::new_int64(1), Cell::new_int64(30)]),
                Tuple::new(&[Cell::new_int64(2), Cell::new_int64(12)]),
                Tuple::new(&[Cell::new_int64(3), Cell::new_int64(1)]),
            ]
        );
        assert_eq!(agg.get_schema().fields_count(), 2);

        agg.rewind().unwrap();
        assert_eq!(collect(&mut agg).len(), 3);
    }

    #[test]
    fn test_ungrouped() {
        let child = rows(&[(1, 10), (2, 5), (1, 20)]);
        let mut agg = Aggregate::new(child, 1, None, AggregateOp::Max).unwrap();
        agg.open().unwrap();
        assert_eq!(collect(&mut agg), vec![Tuple::new(&[Cell::new_int64(20)])]);
        assert_eq!(agg.get_schema().get_fields()[0].name, "max(int-column-1)");
    }

    #[test]
    fn test_unsupported_type() {
        let child = Box::new(Rows {
            schema: Schema::new(vec![Field::new("flag", Type::Bool)]),
            rows: vec![],
            cursor: None,
        });
        let err = Aggregate::new(child, 0, None, AggregateOp::Sum).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
    }
}
