//! Identity classifier.
//!
//! Two replicas are interchangeable when they run the same image with the
//! same number of arguments under the same memory limit. Identifier,
//! name and hostname never participate. Classes are computed from a live
//! listing each time and are never stored.

use std::fmt;

use drydock_runtime::ReplicaDescriptor;

/// True iff `a` and `b` belong to the same replica class.
pub fn same_class(a: &ReplicaDescriptor, b: &ReplicaDescriptor) -> bool {
    a.image == b.image && a.args.len() == b.args.len() && a.memory_limit() == b.memory_limit()
}

/// Fleet-wide image filter: "every replica whose image contains X".
pub fn image_matches(image: &str, substring: &str) -> bool {
    image.contains(substring)
}

/// The fields that define a class, for display and grouping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassKey {
    pub image: String,
    pub arg_count: usize,
    pub memory_limit: i64,
}

impl ClassKey {
    pub fn of(replica: &ReplicaDescriptor) -> Self {
        Self {
            image: replica.image.clone(),
            arg_count: replica.args.len(),
            memory_limit: replica.memory_limit(),
        }
    }
}

impl fmt::Display for ClassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} args", self.image, self.arg_count)?;
        if self.memory_limit > 0 {
            write!(f, ", {} bytes", self.memory_limit)?;
        }
        write!(f, ")")
    }
}

/// Members of one class, in the order the runtime listed them.
#[derive(Debug, Clone)]
pub struct ReplicaClass {
    key: ClassKey,
    members: Vec<ReplicaDescriptor>,
}

impl ReplicaClass {
    /// Keep the candidates that share `reference`'s class.
    pub fn resolve<I>(reference: &ReplicaDescriptor, candidates: I) -> Self
    where
        I: IntoIterator<Item = ReplicaDescriptor>,
    {
        Self {
            key: ClassKey::of(reference),
            members: candidates
                .into_iter()
                .filter(|c| same_class(reference, c))
                .collect(),
        }
    }

    /// Group descriptors into classes. Classes appear in order of their
    /// first member; members keep their relative order.
    pub fn partition<I>(descriptors: I) -> Vec<Self>
    where
        I: IntoIterator<Item = ReplicaDescriptor>,
    {
        let mut classes: Vec<Self> = Vec::new();
        for replica in descriptors {
            match classes
                .iter_mut()
                .find(|class| class.members.first().is_some_and(|m| same_class(m, &replica)))
            {
                Some(class) => class.members.push(replica),
                None => classes.push(Self {
                    key: ClassKey::of(&replica),
                    members: vec![replica],
                }),
            }
        }
        classes
    }

    pub fn key(&self) -> &ClassKey {
        &self.key
    }

    pub fn members(&self) -> &[ReplicaDescriptor] {
        &self.members
    }

    pub fn into_members(self) -> Vec<ReplicaDescriptor> {
        self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
