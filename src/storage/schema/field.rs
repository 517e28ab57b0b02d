use super::Type;

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Field {
    pub name: String,
    pub t: Type,
}

impl Field {
    pub fn new(field_name: &str, field_type: Type) -> Field {
        Field {
            name: field_name.to_string(),
            t: field_type,
        }
    }

    pub fn get_type(&self) -> Type {
        self.t
    }
}
