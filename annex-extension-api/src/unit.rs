//! Unit export protocol
//!
//! A code unit does not get scanned for types. It states what it defines
//! through a list of [`UnitExport`]s, each naming the capabilities it
//! implements and, for concrete contributions, how to construct it.

use std::fmt;

use crate::Extension;

/// Constructor for a contributed extension
pub type ExtensionFactory = fn() -> Box<dyn Extension>;

/// A capability a unit export can implement.
///
/// Capabilities compare by name so exports coming from separately loaded
/// libraries still match the host's constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capability(&'static str);

impl Capability {
    /// Base capability of every dispatched extension
    pub const EXTENSION: Capability = Capability("Extension");

    /// Create a capability with the given name
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The capability's name
    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// One type a unit defines or re-exports
#[derive(Clone)]
pub struct UnitExport {
    /// Type name as declared by the unit
    pub name: String,
    /// Capabilities this type implements, including inherited ones
    pub implements: Vec<Capability>,
    /// Constructor, absent for abstract or re-exported base types
    pub factory: Option<ExtensionFactory>,
}

impl UnitExport {
    /// Export a concrete extension type
    pub fn extension<E>(name: impl Into<String>) -> Self
    where
        E: Extension + Default + 'static,
    {
        Self {
            name: name.into(),
            implements: vec![Capability::EXTENSION],
            factory: Some(construct::<E>),
        }
    }

    /// Export a base capability the unit merely brings into scope
    pub fn base(capability: Capability) -> Self {
        Self {
            name: capability.name().to_string(),
            implements: vec![capability],
            factory: None,
        }
    }

    /// Export an arbitrary type
    pub fn new(
        name: impl Into<String>,
        implements: Vec<Capability>,
        factory: Option<ExtensionFactory>,
    ) -> Self {
        Self {
            name: name.into(),
            implements,
            factory,
        }
    }

    /// Whether this export is a strict, constructible implementor of `base`.
    ///
    /// The base type itself never qualifies, even when it is re-exported.
    pub fn qualifies(&self, base: Capability) -> bool {
        self.name != base.name() && self.implements.contains(&base) && self.factory.is_some()
    }
}

impl fmt::Debug for UnitExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitExport")
            .field("name", &self.name)
            .field("implements", &self.implements)
            .field("constructible", &self.factory.is_some())
            .finish()
    }
}

fn construct<E>() -> Box<dyn Extension>
where
    E: Extension + Default + 'static,
{
    Box::new(E::default())
}
