//! Per-request injection registry.
//!
//! The [`Injector`] maps a type identity to one instance of that type. The
//! dispatcher seeds it with built-in values before the handler chain runs,
//! and every handler may add or replace entries that later handlers in the
//! same chain will observe.
//!
//! Lookups through [`Injector::resolve`] never fail: a type that was never
//! mapped resolves to its [`Default`] value. This leniency is deliberate and
//! means a misspelt or forgotten dependency shows up as an empty value, not
//! as an error; use [`Injector::get`] where absence must be told apart. Each
//! defaulted lookup emits a `debug` event on the `cosine::inject` target.

use std::any::type_name;
use std::fmt;

use http::Extensions;
use tracing::debug;

/// A type-keyed map holding at most one value per type.
#[derive(Default)]
pub struct Injector {
    values: Extensions,
}

impl Injector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under its type, returning the value it replaced.
    pub fn map<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.values.insert(value)
    }

    /// Returns a reference to the value mapped for `T`, if any.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.values.get()
    }

    /// Returns a mutable reference to the value mapped for `T`, if any.
    pub fn get_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.values.get_mut()
    }

    /// Returns a clone of the value mapped for `T`, or `T::default()`.
    pub fn resolve<T: Clone + Default + Send + Sync + 'static>(&self) -> T {
        if let Some(value) = self.get::<T>() {
            return value.clone();
        }

        debug!(target: "cosine::inject", dependency = type_name::<T>(), "no value mapped, using default");
        T::default()
    }

    /// Removes and returns the value mapped for `T`.
    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.values.remove()
    }

    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.get::<T>().is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector").field("len", &self.values.len()).finish()
    }
}
