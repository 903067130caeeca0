//! Integration tests for types

#[cfg(test)]
mod tests {
    use kiln_types::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    #[test]
    fn test_version_range_complex() {
        let range = VersionRange::from_str(">=1.2.0,<2.0.0,!=1.5.0").unwrap();

        assert!(!range.matches(&parse_loose("1.1.9").unwrap()));
        assert!(range.matches(&parse_loose("1.2").unwrap()));
        assert!(!range.matches(&parse_loose("1.5").unwrap()));
        assert!(range.matches(&parse_loose("1.5.1").unwrap()));
        assert!(!range.matches(&parse_loose("2").unwrap()));
    }

    #[test]
    fn test_settings_serialization() {
        let mut builder = Settings::builder();
        builder
            .set_pair("os=Windows")
            .unwrap()
            .set_pair("arch=x86_64")
            .unwrap()
            .set_pair("compiler=msvc")
            .unwrap()
            .set_pair("compiler.version=193")
            .unwrap()
            .set_pair("compiler.cppstd=17")
            .unwrap();
        let settings = builder.build().unwrap();

        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["os"], "Windows");
        assert_eq!(json["compiler"]["kind"], "msvc");
        assert_eq!(json["compiler"]["cppstd"], "17");

        let back: Settings = serde_json::from_value(json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Tty);
        assert_eq!(ColorChoice::default(), ColorChoice::Auto);
    }

    proptest! {
        #[test]
        fn loose_padding_is_equal(major in 0u64..1000, minor in 0u64..100) {
            let short = parse_loose(&format!("{major}.{minor}")).unwrap();
            let long = parse_loose(&format!("{major}.{minor}.0")).unwrap();
            prop_assert_eq!(short, long);
        }

        #[test]
        fn loose_order_matches_tuple_order(
            a in (0u64..50, 0u64..50, 0u64..50),
            b in (0u64..50, 0u64..50, 0u64..50),
        ) {
            let va = parse_loose(&format!("{}.{}.{}", a.0, a.1, a.2)).unwrap();
            let vb = parse_loose(&format!("{}.{}.{}", b.0, b.1, b.2)).unwrap();
            prop_assert_eq!(va.cmp(&vb), a.cmp(&b));
        }

        #[test]
        fn minimum_constraint_partitions(floor in 0u64..300, candidate in 0u64..300) {
            let range = VersionRange::from_str(&format!(">={floor}")).unwrap();
            let version = parse_loose(&candidate.to_string()).unwrap();
            prop_assert_eq!(range.matches(&version), candidate >= floor);
        }
    }
}
