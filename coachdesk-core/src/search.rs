//! Roster search
//!
//! Queries are matched case-insensitively as substrings; an empty query
//! matches everything.

/// Normalized search query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn hit(&self, field: &str) -> bool {
        field.to_lowercase().contains(&self.0)
    }

    /// Students match on first name, surname or phone
    pub fn matches_student(&self, nombre: &str, apellido: &str, telefono: &str) -> bool {
        self.is_empty() || self.hit(nombre) || self.hit(apellido) || telefono.contains(&self.0)
    }

    /// Clubs match on name, address or comuna
    pub fn matches_club(&self, nombre: &str, direccion: &str, comuna: &str) -> bool {
        self.is_empty() || self.hit(nombre) || self.hit(direccion) || self.hit(comuna)
    }
}

impl From<Option<&str>> for Query {
    fn from(raw: Option<&str>) -> Self {
        raw.map(Query::new).unwrap_or_default()
    }
}
