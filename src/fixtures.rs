#[cfg(test)]
pub mod test {
    use std::collections::{BTreeMap, BTreeSet};

    use crate::convert::{self, ValueMap};
    use crate::registry::{Binding, Registry};

    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub enum Mode {
        #[default]
        Fast,
        Slow,
    }

    /// Sample application settings.
    #[derive(Debug, Default, PartialEq)]
    pub struct Settings {
        /// `server.host`, required.
        pub host: String,
        /// `server.port`, 1 to 65535.
        pub port: u16,
        /// Every `limits.*` property, keyed by full name.
        pub limits: BTreeMap<String, i64>,
        /// `tags`, a comma-separated set; may be empty.
        pub tags: BTreeSet<String>,
        /// `mode`, `fast` or `slow`.
        pub mode: Mode,
    }

    pub fn registry() -> Registry<Settings> {
        let mut r = Registry::new();
        r.property("server.host", Binding::required(), convert::string(), |s: &mut Settings, v| {
            s.host = v
        })
        .unwrap();
        r.property(
            "server.port",
            Binding::optional(),
            convert::int_in_range(1, 65535),
            |s: &mut Settings, v| s.port = v as u16,
        )
        .unwrap();
        r.prefix("limits.", Binding::optional(), convert::int(), |s: &mut Settings, name, v| {
            s.limits.insert(name.to_string(), v);
        })
        .unwrap();
        r.property(
            "tags",
            Binding::optional().allow_empty(),
            convert::set(",", convert::string()),
            |s: &mut Settings, v| s.tags = v,
        )
        .unwrap();
        let modes: ValueMap<Mode> = [("fast", Mode::Fast), ("slow", Mode::Slow)]
            .into_iter()
            .collect();
        r.property("mode", Binding::optional(), modes, |s: &mut Settings, v| s.mode = v)
            .unwrap();
        r
    }

    #[test]
    fn fixture_registry_registers_everything() {
        let r = registry();
        assert_eq!(r.len(), 5);
        assert!(r.contains("limits."));
        assert!(r.contains("server.host"));
    }

    #[test]
    fn default_settings() {
        let s = Settings::default();
        assert_eq!(s.mode, Mode::Fast);
        assert!(s.host.is_empty());
    }
}
