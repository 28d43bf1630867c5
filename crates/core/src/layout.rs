use hashbrown::HashMap;

/// Storage type of a dimension column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimType {
    Unsigned8,
    Unsigned16,
    Signed32,
    Double,
}

/// Handle to a registered dimension. Only valid for the layout that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DimId(pub(crate) usize);

impl DimId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
struct DimEntry {
    name: String,
    ty: DimType,
}

/// Name to dimension registry of a point table.
///
/// `Classification` is always present as the first dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    entries: Vec<DimEntry>,
    by_name: HashMap<String, DimId>,
}

pub const CLASSIFICATION: &str = "Classification";

impl Layout {
    pub fn new() -> Self {
        let mut layout = Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
        };
        layout.register_or_assign(CLASSIFICATION, DimType::Unsigned8);
        layout
    }

    /// Returns the id of `name`, registering it with `ty` if it is unknown.
    ///
    /// An existing dimension keeps its original type. The boolean is true when
    /// a new dimension was created.
    pub(crate) fn register_or_assign(&mut self, name: &str, ty: DimType) -> (DimId, bool) {
        if let Some(&id) = self.by_name.get(name) {
            return (id, false);
        }
        let id = DimId(self.entries.len());
        self.entries.push(DimEntry {
            name: name.to_string(),
            ty,
        });
        self.by_name.insert(name.to_string(), id);
        (id, true)
    }

    pub fn find(&self, name: &str) -> Option<DimId> {
        self.by_name.get(name).copied()
    }

    pub fn dim_type(&self, dim: DimId) -> DimType {
        self.entries[dim.0].ty
    }

    pub fn name(&self, dim: DimId) -> &str {
        &self.entries[dim.0].name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|e| e.name.as_str())
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new()
    }
}
