use std::fmt;

use crate::storage::tuple::{Cell, Tuple};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEq,
    LessThan,
    LessThanOrEq,
}

impl Op {
    pub fn apply(&self, left: &Cell, right: &Cell) -> bool {
        match self {
            Op::Equals => left == right,
            Op::NotEquals => left != right,
            Op::GreaterThan => left > right,
            Op::GreaterThanOrEq => left >= right,
            Op::LessThan => left < right,
            Op::LessThanOrEq => left <= right,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let symbol = match self {
            Op::Equals => "=",
            Op::NotEquals => "<>",
            Op::GreaterThan => ">",
            Op::GreaterThanOrEq => ">=",
            Op::LessThan => "<",
            Op::LessThanOrEq => "<=",
        };
        write!(f, "{}", symbol)
    }
}

/// Compares one field of a tuple against a constant.
#[derive(Clone, Debug)]
pub struct Predicate {
    pub field_index: usize,
    pub op: Op,
    pub cell: Cell,
}

impl Predicate {
    pub fn new(field_index: usize, op: Op, cell: Cell) -> Self {
        Self {
            field_index,
            op,
            cell,
        }
    }

    pub fn matches(&self, tuple: &Tuple) -> bool {
        match tuple.get_cells().get(self.field_index) {
            Some(cell) => self.op.apply(cell, &self.cell),
            None => false,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "${} {} {}", self.field_index, self.op, self.cell)
    }
}
