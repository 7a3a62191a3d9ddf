//! Header record messages (generated from `proto/backup.proto`) and
//! name-based access to the feature table.

include!(concat!(env!("OUT_DIR"), "/wacrypt.rs"));

macro_rules! feature_flags {
    ($($name:ident),* $(,)?) => {
        /// Every feature flag name the record schema defines, in field order.
        pub const FEATURE_NAMES: &[&str] = &[$(stringify!($name)),*];

        impl BackupInfo {
            /// Value of the named feature flag, or `None` if the schema has no such flag.
            pub fn feature(&self, name: &str) -> Option<bool> {
                match name {
                    $(stringify!($name) => Some(self.$name),)*
                    _ => None,
                }
            }

            /// Set the named feature flag. Returns `false` if the schema has no such flag.
            pub fn set_feature(&mut self, name: &str, value: bool) -> bool {
                match name {
                    $(stringify!($name) => {
                        self.$name = value;
                        true
                    })*
                    _ => false,
                }
            }
        }
    };
}

feature_flags!(
    f_5, f_6, f_7, f_8, f_9, f_10, f_11, f_12, f_13, f_14, f_15, f_16, f_17, f_18, f_19, f_20,
    f_21, f_22, f_23, f_24, f_25, f_26, f_27, f_28, f_29, f_30, f_31, f_32, f_33, f_34, f_35,
    f_36, f_37, f_38, f_39,
);

impl BackupInfo {
    /// Names of the feature flags that are set, in field order.
    pub fn enabled_features(&self) -> Vec<&'static str> {
        FEATURE_NAMES
            .iter()
            .copied()
            .filter(|name| self.feature(name) == Some(true))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_feature_names_cover_schema() {
        assert_eq!(FEATURE_NAMES.len(), 35);
        assert_eq!(FEATURE_NAMES.first(), Some(&"f_5"));
        assert_eq!(FEATURE_NAMES.last(), Some(&"f_39"));
    }

    #[test]
    fn test_set_and_get_feature() {
        let mut info = BackupInfo::default();
        assert_eq!(info.feature("f_13"), Some(false));
        assert!(info.set_feature("f_13", true));
        assert_eq!(info.feature("f_13"), Some(true));
        assert!(info.f_13);
    }

    #[test]
    fn test_unknown_feature() {
        let mut info = BackupInfo::default();
        assert_eq!(info.feature("f_4"), None);
        assert!(!info.set_feature("call_log", true));
    }

    #[test]
    fn test_enabled_features_survive_encoding() {
        let mut info = BackupInfo {
            app_version: "2.22.5.13".into(),
            jid_suffix: "67".into(),
            ..Default::default()
        };
        for name in ["f_5", "f_22", "f_39"] {
            info.set_feature(name, true);
        }

        let bytes = info.encode_to_vec();
        let decoded = BackupInfo::decode(bytes.as_slice()).unwrap();

        assert_eq!(decoded.enabled_features(), vec!["f_5", "f_22", "f_39"]);
        assert_eq!(decoded.app_version, "2.22.5.13");
    }
}
