// Copyright (c) 2026 Redglyph (@gmail.com). All Rights Reserved.

use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;
use crate::parser::ParseValue;
use crate::scanner::Token;

/// Coerces value-stack items into user types when a direct type match isn't enough.
///
/// The user actions advertise a converter through
/// [UserActions::value_converter](crate::parser::UserActions::value_converter); the
/// parser activates it for the duration of the parse.
pub trait ValueConverter {
    /// Tries to convert `value` into the `target` type. The returned box must
    /// downcast to `target`; `None` means the converter doesn't handle this
    /// combination.
    fn try_convert(&self, value: ParseValue, target: TypeId) -> Option<Box<dyn Any>>;
}

thread_local! {
    static ACTIVE_CONVERTER: RefCell<Option<Rc<dyn ValueConverter>>> = RefCell::new(None);
}

/// The converter active in this thread, if a parse installed one.
pub fn active_converter() -> Option<Rc<dyn ValueConverter>> {
    ACTIVE_CONVERTER.with(|slot| slot.borrow().clone())
}

/// Scope guard installing a converter in the thread's active slot.
///
/// The previous slot value is saved on activation and put back when the guard drops,
/// on every exit path of the parse.
pub struct ConverterScope {
    previous: Option<Rc<dyn ValueConverter>>,
}

impl ConverterScope {
    pub fn activate(converter: Rc<dyn ValueConverter>) -> Self {
        let previous = ACTIVE_CONVERTER.with(|slot| slot.borrow_mut().replace(converter));
        ConverterScope { previous }
    }
}

impl Drop for ConverterScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE_CONVERTER.with(|slot| *slot.borrow_mut() = previous);
    }
}

// ---------------------------------------------------------------------------------------------

#[derive(Clone, PartialEq, Debug)]
pub struct ConvertError {
    pub source_kind: String,
    pub target: &'static str,
}

impl Display for ConvertError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot convert {} into {}: no direct match and no active converter accepted the value; \
                configure a value converter on the user actions", self.source_kind, self.target)
    }
}

impl Error for ConvertError {}

/// Resolves `value` into a `T`: by direct type match first, then through the active
/// converter, and fails with a [ConvertError] otherwise.
pub fn convert_to<T: Any>(value: ParseValue) -> Result<T, ConvertError> {
    let source_kind = value.kind_name().to_string();
    let value = match direct::<T>(value) {
        Ok(v) => return Ok(v),
        Err(v) => v,
    };
    if let Some(converter) = active_converter() {
        if let Some(converted) = converter.try_convert(value, TypeId::of::<T>()) {
            if let Ok(v) = converted.downcast::<T>() {
                return Ok(*v);
            }
        }
    }
    Err(ConvertError { source_kind, target: type_name::<T>() })
}

fn direct<T: Any>(value: ParseValue) -> Result<T, ParseValue> {
    match value {
        ParseValue::Token(token) => {
            match (Box::new(token) as Box<dyn Any>).downcast::<T>() {
                Ok(v) => Ok(*v),
                Err(boxed) => Err(ParseValue::Token(*boxed.downcast::<Token>().unwrap())),
            }
        }
        ParseValue::User(user) => user.downcast::<T>().map_err(ParseValue::User),
    }
}

// ---------------------------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------------------------

#[cfg(test)]
mod convert {
    use super::*;

    struct ToNum;

    impl ValueConverter for ToNum {
        fn try_convert(&self, value: ParseValue, target: TypeId) -> Option<Box<dyn Any>> {
            if target != TypeId::of::<i32>() {
                return None;
            }
            match value {
                ParseValue::User(user) => user.downcast::<String>().ok()
                    .and_then(|s| s.parse::<i32>().ok())
                    .map(|n| Box::new(n) as Box<dyn Any>),
                ParseValue::Token(_) => None,
            }
        }
    }

    #[test]
    fn direct_match() {
        let value = ParseValue::user(42_u32);
        assert_eq!(convert_to::<u32>(value), Ok(42));
    }

    #[test]
    fn no_converter() {
        let value = ParseValue::user("51".to_string());
        let error = convert_to::<i32>(value).unwrap_err();
        assert_eq!(error.source_kind, std::any::type_name::<String>());
        assert_eq!(error.target, std::any::type_name::<i32>());
    }

    #[test]
    fn active_converter_scope() {
        assert!(active_converter().is_none());
        {
            let _scope = ConverterScope::activate(Rc::new(ToNum));
            assert!(active_converter().is_some());
            assert_eq!(convert_to::<i32>(ParseValue::user("51".to_string())), Ok(51));
            assert!(convert_to::<i32>(ParseValue::user("abc".to_string())).is_err());
        }
        assert!(active_converter().is_none());
        assert!(convert_to::<i32>(ParseValue::user("51".to_string())).is_err());
    }

    #[test]
    fn nested_scopes_restore_in_order() {
        let first: Rc<dyn ValueConverter> = Rc::new(ToNum);
        let outer = ConverterScope::activate(first.clone());
        {
            let _inner = ConverterScope::activate(Rc::new(ToNum));
            assert!(active_converter().is_some());
        }
        assert!(Rc::ptr_eq(&active_converter().unwrap(), &first));
        drop(outer);
        assert!(active_converter().is_none());
    }

    #[test]
    fn restored_on_panic() {
        let result = std::panic::catch_unwind(|| {
            let _scope = ConverterScope::activate(Rc::new(ToNum));
            panic!("boom");
        });
        assert!(result.is_err());
        assert!(active_converter().is_none());
    }
}
