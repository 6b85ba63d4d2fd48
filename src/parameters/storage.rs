//! Parameter store
//!
//! Bounded name/value store standing in for the configuration persistence
//! layer this core is wired to. The owning system loads it at boot and
//! writes it back on change; this core registers defaults and reads values.
//!
//! Values marked [`ParamFlags::VOLATILE`] are runtime toggles (fault
//! injection and similar) that the owning system must not persist across a
//! reset.

use super::error::ParameterError;
use bitflags::bitflags;
use heapless::FnvIndexMap;
use heapless::String;

/// Maximum parameter name length
pub const PARAM_NAME_LEN: usize = 16;

/// Maximum number of parameters (power of two, index map requirement)
pub const MAX_PARAMS: usize = 64;

bitflags! {
    /// Parameter flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ParamFlags: u8 {
        /// Parameter cannot be modified after registration
        const READ_ONLY = 0b0000_0001;
        /// Parameter must not be persisted across a reset
        const VOLATILE = 0b0000_0010;
    }
}

/// Parameter value types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    /// Boolean parameter
    Bool(bool),
    /// 32-bit signed integer
    Int(i32),
    /// 32-bit floating point
    Float(f32),
}

impl ParamValue {
    /// Read the value as f32 regardless of stored type
    pub fn as_f32(&self) -> f32 {
        match self {
            ParamValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            ParamValue::Int(i) => *i as f32,
            ParamValue::Float(v) => *v,
        }
    }

    /// Read the value as i32 regardless of stored type
    pub fn as_i32(&self) -> i32 {
        match self {
            ParamValue::Bool(b) => *b as i32,
            ParamValue::Int(i) => *i,
            ParamValue::Float(v) => *v as i32,
        }
    }

    /// Read the value as bool regardless of stored type
    pub fn as_bool(&self) -> bool {
        match self {
            ParamValue::Bool(b) => *b,
            ParamValue::Int(i) => *i != 0,
            ParamValue::Float(v) => *v != 0.0,
        }
    }
}

/// Per-parameter metadata
#[derive(Debug, Clone, Copy)]
struct ParamMetadata {
    flags: ParamFlags,
}

/// Parameter store for configuration management
///
/// Stores parameters as key/value pairs with metadata. Registration is
/// idempotent so repeated boot sequences do not clobber loaded values.
pub struct ParameterStore {
    parameters: FnvIndexMap<String<PARAM_NAME_LEN>, ParamValue, MAX_PARAMS>,
    metadata: FnvIndexMap<String<PARAM_NAME_LEN>, ParamMetadata, MAX_PARAMS>,
    dirty: bool,
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterStore {
    /// Create a new empty parameter store
    pub fn new() -> Self {
        Self {
            parameters: FnvIndexMap::new(),
            metadata: FnvIndexMap::new(),
            dirty: false,
        }
    }

    fn key(name: &str) -> Result<String<PARAM_NAME_LEN>, ParameterError> {
        if name.is_empty() {
            return Err(ParameterError::InvalidName);
        }
        let mut key = String::new();
        key.push_str(name).map_err(|_| ParameterError::InvalidName)?;
        Ok(key)
    }

    /// Get parameter value
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        let key = Self::key(name).ok()?;
        self.parameters.get(&key)
    }

    /// Set parameter value
    ///
    /// Marks the store as dirty (needs persistence by the owning system).
    ///
    /// # Errors
    ///
    /// Returns `Unknown` for unregistered names and `ReadOnly` for
    /// parameters registered with [`ParamFlags::READ_ONLY`].
    pub fn set(&mut self, name: &str, value: ParamValue) -> Result<(), ParameterError> {
        let key = Self::key(name)?;

        if !self.parameters.contains_key(&key) {
            return Err(ParameterError::Unknown);
        }
        if let Some(meta) = self.metadata.get(&key) {
            if meta.flags.contains(ParamFlags::READ_ONLY) {
                return Err(ParameterError::ReadOnly);
            }
        }

        self.parameters.insert(key, value).ok();
        self.dirty = true;
        Ok(())
    }

    /// Register a new parameter with default value and flags
    ///
    /// If the parameter already exists this is a no-op, so defaults never
    /// overwrite values the persistence layer loaded before registration.
    pub fn register(
        &mut self,
        name: &str,
        default_value: ParamValue,
        flags: ParamFlags,
    ) -> Result<(), ParameterError> {
        let key = Self::key(name)?;

        if self.parameters.contains_key(&key) {
            return Ok(());
        }

        self.parameters
            .insert(key.clone(), default_value)
            .map_err(|_| ParameterError::StoreFull)?;
        self.metadata
            .insert(key, ParamMetadata { flags })
            .map_err(|_| ParameterError::StoreFull)?;
        self.dirty = true;
        Ok(())
    }

    /// Check whether a parameter must not be persisted
    pub fn is_volatile(&self, name: &str) -> bool {
        match Self::key(name) {
            Ok(key) => self
                .metadata
                .get(&key)
                .map(|m| m.flags.contains(ParamFlags::VOLATILE))
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Iterate over persistable parameters as (name, value) pairs
    pub fn iter_persistent(&self) -> impl Iterator<Item = (&String<PARAM_NAME_LEN>, &ParamValue)> {
        self.parameters
            .iter()
            .filter(|(name, _)| !self.is_volatile(name.as_str()))
    }

    /// Get total parameter count
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Check if store has unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear dirty flag (called by the owning system after a save)
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_get() {
        let mut store = ParameterStore::new();
        store
            .register("H_TAIL_TYPE", ParamValue::Int(1), ParamFlags::empty())
            .unwrap();

        assert_eq!(store.get("H_TAIL_TYPE"), Some(&ParamValue::Int(1)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn register_is_idempotent() {
        let mut store = ParameterStore::new();
        store
            .register("H_COL_YAW", ParamValue::Float(2.0), ParamFlags::empty())
            .unwrap();
        store.set("H_COL_YAW", ParamValue::Float(-3.5)).unwrap();

        // Second registration must not clobber the loaded value
        store
            .register("H_COL_YAW", ParamValue::Float(2.0), ParamFlags::empty())
            .unwrap();
        assert_eq!(store.get("H_COL_YAW"), Some(&ParamValue::Float(-3.5)));
    }

    #[test]
    fn set_unknown_rejected() {
        let mut store = ParameterStore::new();
        assert_eq!(
            store.set("NOPE", ParamValue::Int(1)),
            Err(ParameterError::Unknown)
        );
    }

    #[test]
    fn read_only_rejected() {
        let mut store = ParameterStore::new();
        store
            .register("H_SW_COUNT", ParamValue::Int(3), ParamFlags::READ_ONLY)
            .unwrap();
        assert_eq!(
            store.set("H_SW_COUNT", ParamValue::Int(2)),
            Err(ParameterError::ReadOnly)
        );
    }

    #[test]
    fn volatile_excluded_from_persistence() {
        let mut store = ParameterStore::new();
        store
            .register("FAULT_ENABLE", ParamValue::Bool(false), ParamFlags::VOLATILE)
            .unwrap();
        store
            .register("H_TAIL_SPEED", ParamValue::Int(50), ParamFlags::empty())
            .unwrap();

        let names: heapless::Vec<&str, 4> = store
            .iter_persistent()
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0], "H_TAIL_SPEED");
    }

    #[test]
    fn dirty_tracking() {
        let mut store = ParameterStore::new();
        store
            .register("H_FLYBAR_MODE", ParamValue::Bool(false), ParamFlags::empty())
            .unwrap();
        assert!(store.is_dirty());

        store.clear_dirty();
        assert!(!store.is_dirty());

        store.set("H_FLYBAR_MODE", ParamValue::Bool(true)).unwrap();
        assert!(store.is_dirty());
    }

    #[test]
    fn value_coercions() {
        assert_eq!(ParamValue::Int(350).as_f32(), 350.0);
        assert_eq!(ParamValue::Float(0.5).as_i32(), 0);
        assert!(ParamValue::Int(1).as_bool());
        assert!(!ParamValue::Float(0.0).as_bool());
    }
}
