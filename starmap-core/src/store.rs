//! Single source of truth for values that are shown in more than one place.
//!
//! The date, the coordinates and the zoom level each appear in the form and in
//! one or more read-only displays. Writers call [`FormStore::set`]; every
//! display registered with [`FormStore::bind`] is updated from there.

use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Date,
    Coordinates,
    Zoom,
    Place,
}

type Binding = Box<dyn Fn(&str)>;

#[derive(Default)]
pub struct FormStore {
    values: HashMap<FieldKey, String>,
    bindings: HashMap<FieldKey, Vec<Binding>>,
}

impl FormStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a display. It receives the current value right away if one is set.
    pub fn bind(&mut self, key: FieldKey, f: impl Fn(&str) + 'static) {
        if let Some(v) = self.values.get(&key) {
            f(v);
        }
        self.bindings.entry(key).or_default().push(Box::new(f));
    }

    /// Store a value and notify bindings. Returns false when nothing changed.
    pub fn set(&mut self, key: FieldKey, value: impl Into<String>) -> bool {
        let value = value.into();
        if self.values.get(&key) == Some(&value) {
            return false;
        }
        if let Some(bs) = self.bindings.get(&key) {
            for b in bs {
                b(&value);
            }
        }
        self.values.insert(key, value);
        true
    }

    pub fn get(&self, key: FieldKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn bindings_follow_the_value() {
        let mut store = FormStore::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s1 = seen.clone();
        store.bind(FieldKey::Date, move |v| s1.borrow_mut().push(format!("a:{v}")));
        let s2 = seen.clone();
        store.bind(FieldKey::Date, move |v| s2.borrow_mut().push(format!("b:{v}")));

        assert!(store.set(FieldKey::Date, "2024-06-21"));
        assert!(!store.set(FieldKey::Date, "2024-06-21"));
        assert_eq!(*seen.borrow(), ["a:2024-06-21", "b:2024-06-21"]);
        assert_eq!(store.get(FieldKey::Date), Some("2024-06-21"));
        assert_eq!(store.get(FieldKey::Zoom), None);
    }

    #[test]
    fn late_binding_gets_current_value() {
        let mut store = FormStore::new();
        store.set(FieldKey::Zoom, "4");
        let seen = Rc::new(RefCell::new(String::new()));
        let s = seen.clone();
        store.bind(FieldKey::Zoom, move |v| *s.borrow_mut() = v.to_string());
        assert_eq!(*seen.borrow(), "4");
    }
}
