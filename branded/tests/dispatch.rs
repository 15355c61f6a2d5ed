use branded::integrations::json::JsonConverterRegistry;
use branded::integrations::sql::{SqlTranslatorRegistry, SqlValue, StringHint};
use branded::{BrandError, BrandedConverter, BrandedDispatcher, BrandedType};
use serde_json::{Value, json};

// Hand-written equivalents of what branded-build emits, so the dispatch
// surface is exercised end-to-end without running the generator.

macro_rules! wrapper {
    ($name:ident, $converter:ident, $inner:ty) => {
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name(pub $inner);

        pub struct $converter;

        impl BrandedConverter<$name, $inner> for $converter {
            fn wrap(inner: $inner) -> $name {
                $name(inner)
            }

            fn unwrap(value: $name) -> $inner {
                value.0
            }
        }

        impl BrandedType for $name {
            type Inner = $inner;
            type Converter = $converter;
        }

        impl $name {
            pub fn dispatch<D: BrandedDispatcher>(dispatcher: &mut D) {
                dispatcher.dispatch::<$name, $inner, $converter>();
            }
        }
    };
}

wrapper!(SmallId, SmallIdConverter, i32);
wrapper!(BigId, BigIdConverter, i64);
wrapper!(SmallCount, SmallCountConverter, u32);
wrapper!(BigCount, BigCountConverter, u64);
wrapper!(UserName, UserNameConverter, String);

fn json_registry() -> JsonConverterRegistry {
    let mut registry = JsonConverterRegistry::new();
    SmallId::dispatch(&mut registry);
    BigId::dispatch(&mut registry);
    SmallCount::dispatch(&mut registry);
    BigCount::dispatch(&mut registry);
    UserName::dispatch(&mut registry);
    registry
}

#[test]
fn converter_round_trips() {
    let wrapped = SmallIdConverter::wrap(42);
    assert_eq!(wrapped, SmallId(42));
    assert_eq!(SmallIdConverter::unwrap(wrapped), 42);

    let name = UserNameConverter::wrap("alex".to_owned());
    assert_eq!(UserNameConverter::unwrap(name), "alex");
}

#[test]
fn converter_is_reachable_through_the_branded_type_binding() {
    let wrapped = <SmallId as BrandedType>::Converter::wrap(7);
    assert_eq!(wrapped, SmallId(7));
}

#[test]
fn json_decode_and_encode_round_trip() {
    let registry = json_registry();

    let id: SmallId = registry.decode(&json!(17)).unwrap();
    assert_eq!(id, SmallId(17));
    assert_eq!(registry.encode(&id).unwrap(), json!(17));

    let count: BigCount = registry.decode(&json!(12_000_000_000u64)).unwrap();
    assert_eq!(registry.encode(&count).unwrap(), json!(12_000_000_000u64));

    let name: UserName = registry.decode(&json!("rain")).unwrap();
    assert_eq!(name, UserName("rain".to_owned()));
    assert_eq!(registry.encode(&name).unwrap(), json!("rain"));
}

#[test]
fn json_null_is_an_invalid_cast_for_every_inner_kind() {
    let registry = json_registry();

    fn assert_null_rejected<B: std::fmt::Debug + 'static>(registry: &JsonConverterRegistry) {
        let error = registry.decode::<B>(&Value::Null).unwrap_err();
        match &error {
            BrandError::InvalidCast { wrapper, found } => {
                assert_eq!(*wrapper, std::any::type_name::<B>());
                assert_eq!(*found, "null");
            }
            other => panic!("expected InvalidCast, got {other:?}"),
        }
        assert!(error.to_string().contains(std::any::type_name::<B>()));
    }

    assert_null_rejected::<SmallId>(&registry);
    assert_null_rejected::<BigId>(&registry);
    assert_null_rejected::<SmallCount>(&registry);
    assert_null_rejected::<BigCount>(&registry);
    assert_null_rejected::<UserName>(&registry);
}

#[test]
fn json_wrong_kind_is_an_invalid_cast() {
    let registry = json_registry();

    let error = registry.decode::<SmallId>(&json!("not a number")).unwrap_err();
    assert!(matches!(error, BrandError::InvalidCast { .. }));

    // Out-of-range and negative values do not fit the inner kind either.
    assert!(registry.decode::<SmallId>(&json!(i64::MAX)).is_err());
    assert!(registry.decode::<SmallCount>(&json!(-1)).is_err());
}

#[test]
fn json_unsupported_inner_kind_is_reported() {
    wrapper!(Ratio, RatioConverter, f64);

    let mut registry = JsonConverterRegistry::new();
    Ratio::dispatch(&mut registry);

    let error = registry.decode::<Ratio>(&json!(0.5)).unwrap_err();
    assert!(matches!(error, BrandError::UnsupportedInnerKind { .. }));
    let error = registry.encode(&Ratio(0.5)).unwrap_err();
    assert!(matches!(error, BrandError::UnsupportedInnerKind { .. }));
}

#[test]
fn json_unregistered_wrapper_is_reported() {
    let registry = JsonConverterRegistry::new();
    let error = registry.decode::<SmallId>(&json!(1)).unwrap_err();
    assert!(matches!(error, BrandError::NotRegistered { .. }));
    assert!(!registry.is_registered::<SmallId>());
}

#[test]
fn sql_read_and_write_round_trip() {
    let mut registry = SqlTranslatorRegistry::new();
    SmallId::dispatch(&mut registry);
    UserName::dispatch(&mut registry);

    let id: SmallId = registry.read(SqlValue::Int(3)).unwrap();
    assert_eq!(id, SmallId(3));
    let parameter = registry.write(&id).unwrap();
    assert_eq!(parameter.value, SqlValue::Int(3));
    assert_eq!(parameter.hint, None);

    let owner: UserName = registry.read(SqlValue::Text("alex".to_owned())).unwrap();
    assert_eq!(registry.write(&owner).unwrap().value, SqlValue::Text("alex".to_owned()));
}

#[test]
fn sql_string_hints_are_attached_to_text_parameters_only() {
    let mut registry = SqlTranslatorRegistry::new();
    SmallId::dispatch(&mut registry);
    UserName::dispatch(&mut registry);
    registry.register_string_hint::<UserName>(StringHint::fixed_ansi(50));
    registry.register_string_hint::<SmallId>(StringHint::ansi());

    let hint = registry
        .write(&UserName("alex".to_owned()))
        .unwrap()
        .hint
        .expect("text parameter carries its hint");
    assert_eq!(hint.length, Some(50));
    assert!(hint.ansi);

    // Hints never apply to non-text values, even if declared.
    assert_eq!(registry.write(&SmallId(1)).unwrap().hint, None);
}

#[test]
fn sql_kind_mismatch_is_an_invalid_cast() {
    let mut registry = SqlTranslatorRegistry::new();
    SmallId::dispatch(&mut registry);

    let error = registry.read::<SmallId>(SqlValue::Text("3".to_owned())).unwrap_err();
    assert!(matches!(error, BrandError::InvalidCast { .. }));
}

#[test]
fn declaration_macros_compile_away() {
    branded::conventions! {
        type_name_pattern = r"Id$",
    }

    branded::decorate! {
        target = some::registration,
        args = [WrapperType, InnerType],
    }
}
