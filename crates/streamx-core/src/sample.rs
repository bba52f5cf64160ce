use crate::error::SampleError;
use crate::registry::ResourceRegistry;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Instant;
use streamx_common::{AttrValue, AttributeDescriptor, ObjectName, Snapshot};

/// A discovered resource and the attribute metadata read at discovery.
#[derive(Debug, Clone)]
pub struct Resource {
    name: ObjectName,
    descriptors: Vec<AttributeDescriptor>,
    seq: u64,
}

impl Resource {
    pub fn new(name: ObjectName, descriptors: Vec<AttributeDescriptor>, seq: u64) -> Self {
        Self {
            name,
            descriptors,
            seq,
        }
    }

    pub fn name(&self) -> &ObjectName {
        &self.name
    }

    pub fn descriptors(&self) -> &[AttributeDescriptor] {
        &self.descriptors
    }

    /// Discovery order; resources are sampled in ascending order.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// One resource's attribute read for one cycle.
///
/// The sample starts from the resource's attributes minus the permanently
/// excluded ones. Listeners may exclude more for this cycle only during
/// their `pre_sample` hook. [`sample`](Self::sample) then reads whatever is
/// left, and the flattened result is collected in [`snapshot`](Self::snapshot).
pub struct AttributeSample {
    resource: Arc<Resource>,
    registry: Arc<dyn ResourceRegistry>,
    descriptors: Vec<AttributeDescriptor>,
    excludes: BTreeSet<String>,
    silenced: BTreeSet<String>,
    values: Vec<(String, AttrValue)>,
    error: Option<SampleError>,
    sampled_at: Option<Instant>,
    batch_size: usize,
    snapshot: Snapshot,
}

impl AttributeSample {
    pub fn new(
        resource: Arc<Resource>,
        registry: Arc<dyn ResourceRegistry>,
        permanent_excludes: &HashSet<String>,
        batch_size: usize,
        category: &str,
    ) -> Self {
        let descriptors = resource
            .descriptors()
            .iter()
            .filter(|d| !permanent_excludes.contains(&d.name))
            .cloned()
            .collect();
        let snapshot = Snapshot::new(category, resource.name().canonical());
        Self {
            resource,
            registry,
            descriptors,
            excludes: BTreeSet::new(),
            silenced: BTreeSet::new(),
            values: Vec::new(),
            error: None,
            sampled_at: None,
            batch_size,
            snapshot,
        }
    }

    pub fn resource(&self) -> &Arc<Resource> {
        &self.resource
    }

    pub fn name(&self) -> &ObjectName {
        self.resource.name()
    }

    /// Attributes this sample may read, before cycle-local exclusions.
    pub fn descriptors(&self) -> &[AttributeDescriptor] {
        &self.descriptors
    }

    pub fn descriptor(&self, attribute: &str) -> Option<&AttributeDescriptor> {
        self.descriptors.iter().find(|d| d.name == attribute)
    }

    /// Excludes an attribute for this cycle. Attributes this sample does not
    /// carry are ignored; returns `true` if the attribute was newly excluded.
    pub fn exclude(&mut self, attribute: &str) -> bool {
        if self.descriptor(attribute).is_none() {
            return false;
        }
        self.excludes.insert(attribute.to_string())
    }

    pub fn is_excluded(&self, attribute: &str) -> bool {
        self.excludes.contains(attribute)
    }

    pub fn excludes(&self) -> &BTreeSet<String> {
        &self.excludes
    }

    /// Marks an attribute whose failures should be logged quietly this cycle.
    /// Attributes this sample does not carry are ignored.
    pub fn silence(&mut self, attribute: &str) -> bool {
        if self.descriptor(attribute).is_none() {
            return false;
        }
        self.silenced.insert(attribute.to_string())
    }

    pub fn is_silenced(&self, attribute: &str) -> bool {
        self.silenced.contains(attribute)
    }

    /// `true` if the current error only concerns silenced attributes.
    pub fn error_is_silenced(&self) -> bool {
        match self.error.as_ref().map(SampleError::attribute) {
            None => false,
            Some(Some(attribute)) => self.is_silenced(attribute),
            Some(None) => {
                let attributes = self.attributes_to_sample();
                !attributes.is_empty() && attributes.iter().all(|a| self.is_silenced(a))
            }
        }
    }

    pub fn has_attributes_to_sample(&self) -> bool {
        self.descriptors.len() > self.excludes.len()
    }

    /// Names of the attributes [`sample`](Self::sample) will request.
    pub fn attributes_to_sample(&self) -> Vec<String> {
        self.descriptors
            .iter()
            .filter(|d| !self.excludes.contains(&d.name))
            .map(|d| d.name.clone())
            .collect()
    }

    /// Reads every non-excluded attribute from the registry.
    ///
    /// Attributes the registry leaves out of its answer get the
    /// [`AttrValue::unavailable`] sentinel. A failed registry call is kept as
    /// the sample's error and leaves the previous values in place.
    pub fn sample(&mut self) -> &[(String, AttrValue)] {
        let wanted = self.attributes_to_sample();
        let chunk_size = if self.batch_size == 0 {
            wanted.len().max(1)
        } else {
            self.batch_size
        };

        let mut values = Vec::with_capacity(wanted.len());
        for chunk in wanted.chunks(chunk_size) {
            match self.registry.get_attributes(self.resource.name(), chunk) {
                Ok(mut returned) => {
                    for attribute in chunk {
                        let value = returned
                            .iter()
                            .position(|(name, _)| name == attribute)
                            .map(|i| returned.swap_remove(i).1)
                            .unwrap_or_else(AttrValue::unavailable);
                        values.push((attribute.clone(), value));
                    }
                }
                Err(err) => {
                    self.error = Some(err.into());
                    return &self.values;
                }
            }
        }

        self.values = values;
        self.sampled_at = Some(Instant::now());
        self.snapshot.set_timestamp(chrono::Utc::now());
        &self.values
    }

    pub fn values(&self) -> &[(String, AttrValue)] {
        &self.values
    }

    pub fn value(&self, attribute: &str) -> Option<&AttrValue> {
        self.values
            .iter()
            .find(|(name, _)| name == attribute)
            .map(|(_, value)| value)
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error(&self) -> Option<&SampleError> {
        self.error.as_ref()
    }

    pub fn set_error(&mut self, error: SampleError) {
        self.error = Some(error);
    }

    /// Microseconds since the values were read, or -1 if never read.
    pub fn age_usec(&self) -> i64 {
        self.sampled_at
            .map(|at| at.elapsed().as_micros() as i64)
            .unwrap_or(-1)
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn snapshot_mut(&mut self) -> &mut Snapshot {
        &mut self.snapshot
    }

    /// Borrows the read values and the snapshot being filled at once.
    pub fn values_and_snapshot_mut(&mut self) -> (&[(String, AttrValue)], &mut Snapshot) {
        (&self.values, &mut self.snapshot)
    }

    pub fn into_snapshot(self) -> Snapshot {
        self.snapshot
    }
}

impl std::fmt::Debug for AttributeSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeSample")
            .field("name", self.resource.name())
            .field("descriptors", &self.descriptors.len())
            .field("excludes", &self.excludes)
            .field("silenced", &self.silenced)
            .field("values", &self.values.len())
            .field("error", &self.error)
            .finish()
    }
}
