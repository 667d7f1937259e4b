//! Properties of type identifiers and version tags, checked directly and
//! through the registry over the in-memory ledger.

use super::fixtures::Stack;
use lo_02_type_registry::{type_id_for, Registration, TypeRef, TypeRegistryApi, Version};
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn prop_padded_and_unpadded_versions_pack_alike(major in 0u8..=99, minor in 0u8..=99) {
        let padded: Version = format!("{major:02}.{minor:02}").parse().unwrap();
        let plain: Version = format!("{major}.{minor}").parse().unwrap();

        prop_assert_eq!(padded, plain);
        prop_assert_eq!(padded.packed(), u16::from(major) << 8 | u16::from(minor));
        prop_assert_eq!(Version::from_packed(padded.packed()), padded);
    }

    #[test]
    fn prop_halves_above_99_are_rejected(major in 100u16..1000, minor in 0u8..=99) {
        let wide_major = format!("{major}.{minor}");
        let wide_minor = format!("{minor}.{major}");
        prop_assert!(wide_major.parse::<Version>().is_err());
        prop_assert!(wide_minor.parse::<Version>().is_err());
    }

    #[test]
    fn prop_type_ref_by_name_or_id_agree(name in "[a-z][a-z0-9_]{0,15}") {
        let by_name = TypeRef::parse(&name).unwrap();
        let by_id = TypeRef::parse(&type_id_for(&name).to_string()).unwrap();

        prop_assert_eq!(by_name.type_id(), type_id_for(&name));
        prop_assert_eq!(by_id, TypeRef::Id(type_id_for(&name)));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_registered_type_resolves_with_same_id_and_version(
        name in "[a-z][a-z0-9]{2,12}",
        major in 0u8..=99,
        minor in 0u8..=99,
    ) {
        let version = format!("{major}.{minor}");
        let (first, again, by_name, by_id) = runtime().block_on(async {
            let stack = Stack::new().await;
            let first = stack.registry.register_type(&name, Some(&version)).await.unwrap();
            let again = stack.registry.register_type(&name, Some(&version)).await.unwrap();
            let by_name = stack.registry.resolve_type(&name).await.unwrap();
            let by_id = stack
                .registry
                .resolve_type(&type_id_for(&name).to_string())
                .await
                .unwrap();
            (first, again, by_name, by_id)
        });

        prop_assert!(first.is_new());
        prop_assert!(matches!(again, Registration::AlreadyRegistered(_)));
        prop_assert_eq!(by_name.type_id, type_id_for(&name));
        prop_assert_eq!(by_name.version, Version::new(major, minor).unwrap());
        prop_assert_eq!(by_id, by_name);
    }
}
