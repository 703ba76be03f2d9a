use crate::accessory::Accessory;
use crate::accessory::AccessorySummary;
use crate::record::IncomingRecord;

/// Ordered collection of configured accessories.
///
/// Lookup is a linear scan in configuration order and the first matching
/// accessory wins, never the most specific one.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    accessories: Vec<Accessory>,
}

impl DeviceRegistry {
    pub fn new(accessories: Vec<Accessory>) -> Self {
        Self { accessories }
    }

    /// Index of the first accessory whose identity matches `record`.
    pub fn position(&self, record: &IncomingRecord) -> Option<usize> {
        self.accessories
            .iter()
            .position(|accessory| accessory.identity().matches(record))
    }

    pub fn find_match(&self, record: &IncomingRecord) -> Option<&Accessory> {
        self.position(record).map(|i| &self.accessories[i])
    }

    pub fn find_match_mut(&mut self, record: &IncomingRecord) -> Option<&mut Accessory> {
        self.accessories
            .iter_mut()
            .find(|accessory| accessory.identity().matches(record))
    }

    pub fn get(&self, name: &str) -> Option<&Accessory> {
        self.accessories.iter().find(|a| a.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Accessory> {
        self.accessories.iter()
    }

    pub fn len(&self) -> usize {
        self.accessories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accessories.is_empty()
    }

    pub fn summaries(&self) -> Vec<AccessorySummary> {
        self.iter().map(Accessory::summary).collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::Translations;
    use crate::device::DeviceIdentity;
    use crate::sink::MemorySinkFactory;

    fn registry(identities: Vec<DeviceIdentity>) -> DeviceRegistry {
        let sinks = MemorySinkFactory::new();
        let translations = Translations::default();
        DeviceRegistry::new(
            identities
                .into_iter()
                .map(|identity| Accessory::new(identity, &translations, &sinks))
                .collect(),
        )
    }

    fn record(value: serde_json::Value) -> IncomingRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_first_match_wins_over_more_specific() {
        let registry = registry(vec![
            DeviceIdentity::new("Loose").with_channel(Some(1)),
            DeviceIdentity::new("Exact").with_id(Some(7)).with_channel(Some(1)),
        ]);

        let rec = record(json!({"id": 7, "channel": 1}));
        assert_eq!(registry.position(&rec), Some(0));
        assert_eq!(registry.find_match(&rec).map(Accessory::name), Some("Loose"));
    }

    #[test]
    fn test_skips_non_matching_entries() {
        let mut registry = registry(vec![
            DeviceIdentity::new("Patio").with_id(Some(7)),
            DeviceIdentity::new("Cellar").with_id(Some(9)),
        ]);

        let rec = record(json!({"id": 9}));
        assert_eq!(registry.find_match(&rec).map(Accessory::name), Some("Cellar"));
        assert_eq!(registry.find_match_mut(&rec).map(|a| a.name().to_string()), Some("Cellar".to_string()));
    }

    #[test]
    fn test_no_match() {
        let registry = registry(vec![DeviceIdentity::new("Patio").with_id(Some(7))]);
        assert!(registry.find_match(&record(json!({"id": 8}))).is_none());
        assert!(DeviceRegistry::default().find_match(&record(json!({}))).is_none());
        assert!(DeviceRegistry::default().is_empty());
    }

    #[test]
    fn test_duplicates_are_kept() {
        let registry = registry(vec![
            DeviceIdentity::new("Twin").with_id(Some(3)),
            DeviceIdentity::new("Twin").with_id(Some(3)),
        ]);
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_empty());
        assert_eq!(registry.position(&record(json!({"id": 3}))), Some(0));
    }

    #[test]
    fn test_iterates_in_configuration_order() {
        let registry = registry(vec![
            DeviceIdentity::new("Patio").with_id(Some(7)),
            DeviceIdentity::new("Cellar").with_id(Some(9)),
            DeviceIdentity::new("Attic"),
        ]);
        let names: Vec<_> = registry.iter().map(Accessory::name).collect();
        assert_eq!(names, ["Patio", "Cellar", "Attic"]);
        let summaries: Vec<_> = registry.summaries().into_iter().map(|s| s.name).collect();
        assert_eq!(summaries, names);
    }
}
