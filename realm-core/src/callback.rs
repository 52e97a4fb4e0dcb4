//! Typed callback handles bound to game code
//!
//! The codec never looks anything up by name. Game code binds closures to
//! these handles once during setup; a handle that was never bound is simply
//! absent and every call on it resolves to a zero value or a no-op.
//!
//! Closures are `Fn` so the codec can call them through `&self`. Game state
//! that must be mutated from a setter lives behind shared interior
//! mutability (`Rc<RefCell<_>>` for a single-threaded host loop).

use std::fmt;

/// Handle producing a value of type `T` on demand
pub struct Getter<T> {
    func: Option<Box<dyn Fn() -> T>>,
}

impl<T> Getter<T> {
    /// Bind a closure to a new handle
    pub fn new<F>(func: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self {
            func: Some(Box::new(func)),
        }
    }

    /// Handle with nothing bound
    pub fn unbound() -> Self {
        Self { func: None }
    }

    pub fn is_bound(&self) -> bool {
        self.func.is_some()
    }

    /// Invoke the bound closure, or `None` when nothing is bound
    pub fn get(&self) -> Option<T> {
        self.func.as_ref().map(|func| func())
    }
}

impl<T: Default> Getter<T> {
    /// Invoke the bound closure, falling back to `T::default()`
    pub fn get_or_default(&self) -> T {
        self.get().unwrap_or_default()
    }
}

impl<T> Default for Getter<T> {
    fn default() -> Self {
        Self::unbound()
    }
}

impl<T> fmt::Debug for Getter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Getter")
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// Handle accepting a value of type `T`
pub struct Setter<T> {
    func: Option<Box<dyn Fn(T)>>,
}

impl<T> Setter<T> {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(T) + 'static,
    {
        Self {
            func: Some(Box::new(func)),
        }
    }

    pub fn unbound() -> Self {
        Self { func: None }
    }

    pub fn is_bound(&self) -> bool {
        self.func.is_some()
    }

    /// Pass `value` to the bound closure; no-op when unbound
    pub fn set(&self, value: T) {
        if let Some(func) = &self.func {
            func(value);
        }
    }
}

impl<T> Default for Setter<T> {
    fn default() -> Self {
        Self::unbound()
    }
}

impl<T> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter")
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// Handle to a parameterless hook such as an episode reset
#[derive(Default)]
pub struct Invoker {
    func: Option<Box<dyn Fn()>>,
}

impl Invoker {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self {
            func: Some(Box::new(func)),
        }
    }

    pub fn unbound() -> Self {
        Self { func: None }
    }

    pub fn is_bound(&self) -> bool {
        self.func.is_some()
    }

    pub fn invoke(&self) {
        if let Some(func) = &self.func {
            func();
        }
    }
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoker")
            .field("bound", &self.is_bound())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[test]
    fn test_unbound_handles_resolve_to_zero_values() {
        let getter: Getter<f32> = Getter::unbound();
        assert!(!getter.is_bound());
        assert_eq!(getter.get(), None);
        assert_eq!(getter.get_or_default(), 0.0);

        // Must not panic
        Setter::<i32>::unbound().set(5);
        Invoker::unbound().invoke();
    }

    #[test]
    fn test_bound_handles_reach_shared_state() {
        let state = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&state);
        let setter = Setter::new(move |v: i32| sink.borrow_mut().push(v));
        setter.set(3);
        setter.set(4);

        let source = Rc::clone(&state);
        let getter = Getter::new(move || source.borrow().len() as i32);
        assert_eq!(getter.get(), Some(2));
        assert_eq!(*state.borrow(), vec![3, 4]);
    }

    #[test]
    fn test_invoker_calls_hook() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let hook = Invoker::new(move || counter.set(counter.get() + 1));
        hook.invoke();
        hook.invoke();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_debug_reports_binding() {
        let getter = Getter::new(|| true);
        assert_eq!(format!("{:?}", getter), "Getter { bound: true }");
    }
}
