use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use crate::descriptor::{ServiceTypeInfo, ServiceTypeSupport};
use crate::error::TypeSupportError;
use crate::message::ServiceType;

/// Checks that `name` reads `<package>/srv/<Type>`.
pub fn validate_service_name(name: &str) -> Result<(), TypeSupportError> {
    let invalid = |reason| TypeSupportError::InvalidTypeName {
        name: name.to_string(),
        reason,
    };

    let mut parts = name.split('/');
    let (Some(package), Some(namespace), Some(type_name), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid("expected `<package>/srv/<Type>`"));
    };

    if namespace != "srv" {
        return Err(invalid("middle segment must be `srv`"));
    }

    let mut chars = package.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return Err(invalid("package must start with a lowercase letter")),
    }
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
        return Err(invalid("package may only contain lowercase letters, digits and `_`"));
    }
    if package.ends_with('_') || package.contains("__") {
        return Err(invalid("package may not end with `_` or repeat `_`"));
    }

    let mut chars = type_name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => {}
        _ => return Err(invalid("type must start with an uppercase letter")),
    }
    if !chars.all(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid("type may only contain letters and digits"));
    }

    Ok(())
}

/// Collects descriptors before the registry is frozen.
#[derive(Default)]
pub struct RegistryBuilder {
    by_name: BTreeMap<&'static str, &'static ServiceTypeSupport>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the descriptor of `S`.
    pub fn register<S: ServiceType>(self) -> Result<Self, TypeSupportError> {
        self.register_static(S::type_support())
    }

    /// Registers a descriptor by reference, e.g. one written by hand.
    pub fn register_static(
        mut self,
        type_support: &'static ServiceTypeSupport,
    ) -> Result<Self, TypeSupportError> {
        let name = type_support.name();
        validate_service_name(name)?;
        if self.by_name.contains_key(name) {
            return Err(TypeSupportError::Duplicate(name.to_string()));
        }

        debug!(
            service = name,
            events = type_support.supports_events(),
            "type support registered"
        );
        self.by_name.insert(name, type_support);
        Ok(self)
    }

    pub fn build(self) -> TypeSupportRegistry {
        let by_type = self
            .by_name
            .values()
            .map(|type_support| (type_support.service_type_id(), *type_support))
            .collect();

        info!(services = self.by_name.len(), "type support registry ready");
        TypeSupportRegistry {
            by_name: self.by_name,
            by_type,
        }
    }
}

/// Read-only table of service descriptors.
///
/// Built once through [`RegistryBuilder`] and then shared by reference with
/// whichever subsystem needs lookups. There is no process-global instance.
#[derive(Debug)]
pub struct TypeSupportRegistry {
    by_name: BTreeMap<&'static str, &'static ServiceTypeSupport>,
    by_type: HashMap<TypeId, &'static ServiceTypeSupport>,
}

impl TypeSupportRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn lookup<S: ServiceType>(&self) -> Result<&'static ServiceTypeSupport, TypeSupportError> {
        self.by_type
            .get(&TypeId::of::<S>())
            .copied()
            .ok_or_else(|| TypeSupportError::NotFound(S::NAME.to_string()))
    }

    pub fn lookup_by_name(
        &self,
        name: &str,
    ) -> Result<&'static ServiceTypeSupport, TypeSupportError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| TypeSupportError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Descriptors in service-name order.
    pub fn iter(&self) -> impl Iterator<Item = &'static ServiceTypeSupport> + '_ {
        self.by_name.values().copied()
    }

    pub fn infos(&self) -> Vec<ServiceTypeInfo> {
        self.iter().map(ServiceTypeSupport::info).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Message, Service};

    #[derive(Message, Default, Clone)]
    #[message(name = "demo/msg/Empty")]
    struct Empty;

    #[derive(Service)]
    #[service(name = "demo/srv/First", request = Empty, response = Empty)]
    struct First;

    #[derive(Service)]
    #[service(name = "demo/srv/Second", request = Empty, response = Empty, event)]
    struct Second;

    #[derive(Service)]
    #[service(name = "Bad Name", request = Empty, response = Empty)]
    struct Misnamed;

    #[test]
    fn test_service_names() {
        assert!(validate_service_name("demo/srv/AddTwoInts").is_ok());
        assert!(validate_service_name("demo_2/srv/V2").is_ok());
        assert!(validate_service_name("a/srv/A").is_ok());
        assert!(validate_service_name("my_pkg_2/srv/Go").is_ok());

        for bad in [
            "",
            "demo",
            "demo/srv",
            "demo/msg/Foo",
            "demo/srv/foo",
            "Demo/srv/Foo",
            "demo/srv/Foo/Bar",
            "demo/srv/Foo_Bar",
            "demo_/srv/Foo",
            "de__mo/srv/Foo",
            "_demo/srv/Foo",
        ] {
            assert!(
                matches!(
                    validate_service_name(bad),
                    Err(TypeSupportError::InvalidTypeName { .. })
                ),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_lookup() {
        let registry = TypeSupportRegistry::builder()
            .register::<First>()
            .and_then(|b| b.register::<Second>())
            .expect("registration failed")
            .build();

        assert_eq!(registry.len(), 2);
        assert!(std::ptr::eq(
            registry.lookup::<First>().expect("first"),
            First::type_support()
        ));
        assert!(std::ptr::eq(
            registry.lookup_by_name("demo/srv/Second").expect("second"),
            Second::type_support()
        ));

        let names: Vec<_> = registry.iter().map(|ts| ts.name()).collect();
        assert_eq!(names, ["demo/srv/First", "demo/srv/Second"]);
    }

    #[test]
    fn test_missing_is_not_found() {
        let registry = TypeSupportRegistry::builder()
            .register::<First>()
            .expect("registration failed")
            .build();

        assert_eq!(
            registry.lookup::<Second>().unwrap_err(),
            TypeSupportError::NotFound("demo/srv/Second".to_string())
        );
        assert!(matches!(
            registry.lookup_by_name("demo/srv/Nope"),
            Err(TypeSupportError::NotFound(_))
        ));
        assert!(!registry.contains("demo/srv/Second"));
    }

    #[test]
    fn test_registration_errors() {
        let duplicate = TypeSupportRegistry::builder()
            .register::<First>()
            .and_then(|b| b.register::<First>());
        assert!(matches!(duplicate, Err(TypeSupportError::Duplicate(_))));

        let misnamed = TypeSupportRegistry::builder().register::<Misnamed>();
        assert!(matches!(
            misnamed,
            Err(TypeSupportError::InvalidTypeName { .. })
        ));
    }

    #[test]
    fn test_empty_registry() {
        let registry = RegistryBuilder::new().build();
        assert!(registry.is_empty());
        assert!(registry.infos().is_empty());
    }
}
