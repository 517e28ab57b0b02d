use std::fmt;

use itertools::Itertools;

use super::{Field, Type};

/// The layout of the tuples of a table. Every tuple of a table has the
/// same encoded width, which decides how many slots a page has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<Field>,
}

// Constructors
impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn small_int_schema(width: usize, name_prefix: &str) -> Self {
        let mut fields: Vec<Field> = Vec::new();
        for i in 0..width {
            fields.push(Field::new(
                &format!("{}int-column-{}", name_prefix, i),
                Type::Int64,
            ));
        }

        Self { fields }
    }

    /// A copy of this schema with every field renamed to
    /// `<prefix>.<name>`.
    pub fn with_prefix(&self, prefix: &str) -> Self {
        let fields = self
            .fields
            .iter()
            .map(|f| Field::new(&format!("{}.{}", prefix, f.name), f.t))
            .collect();
        Self { fields }
    }
}

impl Schema {
    /// get tuple size in bytes
    pub fn get_size(&self) -> usize {
        self.fields.iter().map(|f| f.t.size()).sum()
    }

    pub fn get_fields(&self) -> &Vec<Field> {
        &self.fields
    }

    pub fn fields_count(&self) -> usize {
        self.fields.len()
    }

    pub fn get_field_type(&self, i: usize) -> Type {
        self.fields[i].t
    }

    pub fn get_field_pos(&self, field_name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == field_name)
    }

    /// Two schemas are compatible when their types match position by
    /// position, names are ignored.
    pub fn same_types(&self, other: &Schema) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(other.fields.iter())
                .all(|(a, b)| a.t == b.t)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "({})",
            self.fields
                .iter()
                .map(|field| format!("{}: {}", field.name, field.t))
                .join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_size() {
        let schema = Schema::new(vec![
            Field::new("id", Type::Int64),
            Field::new("flag", Type::Bool),
            Field::new("name", Type::Bytes(20)),
        ]);
        assert_eq!(schema.get_size(), 8 + 1 + 21);
        assert_eq!(schema.get_field_type(1), Type::Bool);
        assert_eq!(schema.get_field_type(2), Type::Bytes(20));
        assert_eq!(schema.get_field_pos("name"), Some(2));
        assert_eq!(schema.get_field_pos("missing"), None);
    }

    #[test]
    fn test_prefix_keeps_types() {
        let schema = Schema::small_int_schema(3, "");
        let aliased = schema.with_prefix("t");
        assert_eq!(aliased.get_fields()[0].name, "t.int-column-0");
        assert!(schema.same_types(&aliased));
        assert_ne!(schema, aliased);
    }
}
