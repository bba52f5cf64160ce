use super::{RegistryChangeListener, RegistryEvent, ResourceRegistry};
use crate::error::RegistryError;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use streamx_common::{
    AttrValue, AttributeDescriptor, MalformedName, ObjectName, ObjectNamePattern, ValueShape,
};

struct MemoryResource {
    name: ObjectName,
    descriptors: Vec<AttributeDescriptor>,
    values: HashMap<String, AttrValue>,
}

#[derive(Default)]
struct Faults {
    /// One-shot failures for the next `get_attributes` call on a resource.
    next_get: HashMap<ObjectName, VecDeque<RegistryError>>,
    /// Failures raised whenever the attribute is part of a request.
    attributes: HashMap<(ObjectName, String), RegistryError>,
    /// Attributes silently left out of `get_attributes` results.
    omitted: HashSet<(ObjectName, String)>,
    query: Option<RegistryError>,
}

/// Registry kept entirely in memory.
///
/// Resources are listed in registration order. Change events are delivered
/// synchronously on the thread that calls [`register`](Self::register) or
/// [`unregister`](Self::unregister). The fault hooks script failures for
/// embedding and tests.
///
/// # Examples
///
/// ```
/// use streamx_core::registry::{InMemoryRegistry, ResourceRegistry};
/// use streamx_common::ObjectNamePattern;
///
/// let registry = InMemoryRegistry::new("local");
/// registry.register_values("svc:name=X", vec![("Count", 5.into())]).unwrap();
/// let names = registry.query_names(&ObjectNamePattern::all()).unwrap();
/// assert_eq!(names.len(), 1);
/// ```
pub struct InMemoryRegistry {
    name: String,
    resources: RwLock<Vec<MemoryResource>>,
    subscribers: Mutex<Vec<Arc<dyn RegistryChangeListener>>>,
    faults: Mutex<Faults>,
    get_calls: AtomicUsize,
    last_requests: Mutex<HashMap<ObjectName, Vec<String>>>,
}

impl InMemoryRegistry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: RwLock::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
            faults: Mutex::new(Faults::default()),
            get_calls: AtomicUsize::new(0),
            last_requests: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a resource, replacing any previous one with the same name.
    pub fn register(
        &self,
        name: ObjectName,
        attributes: impl IntoIterator<Item = (AttributeDescriptor, AttrValue)>,
    ) {
        let mut descriptors = Vec::new();
        let mut values = HashMap::new();
        for (descriptor, value) in attributes {
            values.insert(descriptor.name.clone(), value);
            descriptors.push(descriptor);
        }
        {
            let mut resources = self.resources.write();
            resources.retain(|r| r.name != name);
            resources.push(MemoryResource {
                name: name.clone(),
                descriptors,
                values,
            });
        }
        self.notify(RegistryEvent::Registered(name));
    }

    /// Registers a resource whose descriptors are inferred from the values.
    pub fn register_values(
        &self,
        name: &str,
        values: Vec<(&str, AttrValue)>,
    ) -> Result<ObjectName, MalformedName> {
        let object_name = ObjectName::new(name)?;
        let attributes = values.into_iter().map(|(attr, value)| {
            let descriptor = AttributeDescriptor::new(attr, ValueShape::of(&value));
            (descriptor, value)
        });
        self.register(object_name.clone(), attributes);
        Ok(object_name)
    }

    /// Removes a resource. Returns `true` if it was registered.
    pub fn unregister(&self, name: &ObjectName) -> bool {
        let removed = {
            let mut resources = self.resources.write();
            let before = resources.len();
            resources.retain(|r| &r.name != name);
            resources.len() < before
        };
        if removed {
            self.notify(RegistryEvent::Unregistered(name.clone()));
        }
        removed
    }

    /// Updates an attribute value. Returns `false` if the resource is unknown.
    pub fn set_attribute(&self, name: &ObjectName, attribute: &str, value: impl Into<AttrValue>) -> bool {
        let mut resources = self.resources.write();
        match resources.iter_mut().find(|r| &r.name == name) {
            Some(resource) => {
                resource.values.insert(attribute.to_string(), value.into());
                true
            }
            None => false,
        }
    }

    /// Fails the next `get_attributes` call for `name` with `error`.
    pub fn fail_next_get(&self, name: &ObjectName, error: RegistryError) {
        self.faults
            .lock()
            .next_get
            .entry(name.clone())
            .or_default()
            .push_back(error);
    }

    /// Fails every `get_attributes` call that requests `attribute`. The
    /// error is attributed to the attribute.
    pub fn fail_attribute(&self, name: &ObjectName, attribute: &str, error: RegistryError) {
        self.faults.lock().attributes.insert(
            (name.clone(), attribute.to_string()),
            error.for_attribute(attribute),
        );
    }

    /// Leaves `attribute` out of every `get_attributes` result.
    pub fn omit_attribute(&self, name: &ObjectName, attribute: &str) {
        self.faults
            .lock()
            .omitted
            .insert((name.clone(), attribute.to_string()));
    }

    /// Fails `query_names` until [`clear_faults`](Self::clear_faults).
    pub fn fail_queries(&self, error: RegistryError) {
        self.faults.lock().query = Some(error);
    }

    pub fn clear_faults(&self) {
        *self.faults.lock() = Faults::default();
    }

    /// Number of `get_attributes` calls served so far.
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::Relaxed)
    }

    /// Attribute list of the most recent request for `name`.
    pub fn last_request(&self, name: &ObjectName) -> Option<Vec<String>> {
        self.last_requests.lock().get(name).cloned()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    fn notify(&self, event: RegistryEvent) {
        let subscribers: Vec<_> = self.subscribers.lock().iter().cloned().collect();
        for subscriber in subscribers {
            subscriber.on_change(event.clone());
        }
    }
}

impl ResourceRegistry for InMemoryRegistry {
    fn name(&self) -> &str {
        &self.name
    }

    fn query_names(&self, pattern: &ObjectNamePattern) -> Result<Vec<ObjectName>, RegistryError> {
        if let Some(err) = &self.faults.lock().query {
            return Err(err.clone());
        }
        Ok(self
            .resources
            .read()
            .iter()
            .filter(|r| pattern.matches(&r.name))
            .map(|r| r.name.clone())
            .collect())
    }

    fn descriptors(&self, name: &ObjectName) -> Result<Vec<AttributeDescriptor>, RegistryError> {
        self.resources
            .read()
            .iter()
            .find(|r| &r.name == name)
            .map(|r| r.descriptors.clone())
            .ok_or_else(|| RegistryError::not_found(format!("resource {name} is not registered")))
    }

    fn get_attributes(
        &self,
        name: &ObjectName,
        attributes: &[String],
    ) -> Result<Vec<(String, AttrValue)>, RegistryError> {
        self.get_calls.fetch_add(1, Ordering::Relaxed);
        self.last_requests
            .lock()
            .insert(name.clone(), attributes.to_vec());

        let omitted = {
            let mut faults = self.faults.lock();
            if let Some(err) = faults.next_get.get_mut(name).and_then(VecDeque::pop_front) {
                return Err(err);
            }
            for attribute in attributes {
                if let Some(err) = faults.attributes.get(&(name.clone(), attribute.clone())) {
                    return Err(err.clone());
                }
            }
            faults.omitted.clone()
        };

        let resources = self.resources.read();
        let resource = resources
            .iter()
            .find(|r| &r.name == name)
            .ok_or_else(|| RegistryError::not_found(format!("resource {name} is not registered")))?;

        Ok(attributes
            .iter()
            .filter(|attr| !omitted.contains(&(name.clone(), (*attr).clone())))
            .filter_map(|attr| {
                resource
                    .values
                    .get(attr)
                    .map(|value| (attr.clone(), value.clone()))
            })
            .collect())
    }

    fn resource_count(&self) -> Result<usize, RegistryError> {
        Ok(self.resources.read().len())
    }

    fn subscribe(&self, listener: Arc<dyn RegistryChangeListener>) -> Result<bool, RegistryError> {
        self.subscribers.lock().push(listener);
        Ok(true)
    }

    fn unsubscribe(&self, listener: &Arc<dyn RegistryChangeListener>) {
        self.subscribers
            .lock()
            .retain(|existing| !Arc::ptr_eq(existing, listener));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryErrorKind;

    struct Recorder(Mutex<Vec<RegistryEvent>>);

    impl RegistryChangeListener for Recorder {
        fn on_change(&self, event: RegistryEvent) {
            self.0.lock().push(event);
        }
    }

    #[test]
    fn test_missing_attributes_are_left_out() {
        let registry = InMemoryRegistry::new("test");
        let name = registry
            .register_values("svc:name=X", vec![("A", 1.into()), ("B", 2.into())])
            .unwrap();
        registry.omit_attribute(&name, "B");

        let values = registry
            .get_attributes(&name, &["A".to_string(), "B".to_string(), "C".to_string()])
            .unwrap();
        assert_eq!(values, vec![("A".to_string(), AttrValue::Int(1))]);
        assert_eq!(registry.get_calls(), 1);
    }

    #[test]
    fn test_fail_next_get_is_one_shot() {
        let registry = InMemoryRegistry::new("test");
        let name = registry.register_values("svc:name=X", vec![("A", 1.into())]).unwrap();
        registry.fail_next_get(&name, RegistryError::other("boom"));

        let attrs = vec!["A".to_string()];
        assert!(registry.get_attributes(&name, &attrs).is_err());
        assert!(registry.get_attributes(&name, &attrs).is_ok());
    }

    #[test]
    fn test_attribute_fault_is_attributed() {
        let registry = InMemoryRegistry::new("test");
        let name = registry.register_values("svc:name=X", vec![("A", 1.into())]).unwrap();
        registry.fail_attribute(&name, "A", RegistryError::unsupported("opaque"));

        let err = registry.get_attributes(&name, &["A".to_string()]).unwrap_err();
        assert_eq!(err.kind, RegistryErrorKind::UnsupportedType);
        assert_eq!(err.attribute.as_deref(), Some("A"));
    }

    #[test]
    fn test_subscribers_see_register_and_unregister() {
        let registry = InMemoryRegistry::new("test");
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let listener: Arc<dyn RegistryChangeListener> = recorder.clone();
        assert!(registry.subscribe(listener.clone()).unwrap());

        let name = registry.register_values("svc:name=X", vec![]).unwrap();
        assert!(registry.unregister(&name));
        assert!(!registry.unregister(&name));

        registry.unsubscribe(&listener);
        registry.register_values("svc:name=Y", vec![]).unwrap();

        let events = recorder.0.lock();
        assert_eq!(
            *events,
            vec![
                RegistryEvent::Registered(name.clone()),
                RegistryEvent::Unregistered(name),
            ]
        );
    }
}
