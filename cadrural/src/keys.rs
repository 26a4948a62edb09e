use crate::types::EntityKind;

/// Key-construction helpers for the Redis store.
#[derive(Debug, Clone)]
pub struct KeyContext<'a> {
    pub prefix: &'a str,
}

impl<'a> KeyContext<'a> {
    pub fn new(prefix: &'a str) -> Self {
        Self { prefix }
    }

    /// Prefix shared by every document of `kind`; the search index is declared over it.
    pub fn collection_prefix(&self, kind: EntityKind) -> String {
        format!("{}:{}:", self.prefix, kind.collection())
    }

    pub fn entity(&self, kind: EntityKind, entity_id: &str) -> String {
        format!("{}:{}:{}", self.prefix, kind.collection(), entity_id)
    }

    pub fn index(&self, kind: EntityKind) -> String {
        format!("{}:idx:{}", self.prefix, kind.collection())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_entity_and_index_keys() {
        let ctx = KeyContext::new("cadrural");
        assert_eq!(ctx.entity(EntityKind::Herd, "abc"), "cadrural:rebanhos:abc");
        assert_eq!(ctx.index(EntityKind::Producer), "cadrural:idx:produtores_rurais");
        assert!(ctx.entity(EntityKind::Property, "x").starts_with(&ctx.collection_prefix(EntityKind::Property)));
    }
}
