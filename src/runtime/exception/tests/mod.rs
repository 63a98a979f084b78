//! Exception model unit tests
//!
//! Class hierarchy, instance chaining, tracebacks and pending triples.

use crate::runtime::exception::{Exception, ExceptionClass, PendingException, Traceback};
use crate::runtime::value::Value;

#[cfg(test)]
mod class_tests {
    use super::*;

    #[test]
    fn test_builtin_classes_are_shared() {
        assert_eq!(ExceptionClass::type_error(), ExceptionClass::type_error());
        assert_ne!(ExceptionClass::type_error(), ExceptionClass::value_error());
    }

    #[test]
    fn test_generator_exit_is_not_an_exception() {
        let exit = ExceptionClass::generator_exit();
        assert!(exit.is_subclass_of(&ExceptionClass::base_exception()));
        assert!(!exit.is_subclass_of(&ExceptionClass::exception()));
    }

    #[test]
    fn test_stop_iteration_is_an_exception() {
        let stop = ExceptionClass::stop_iteration();
        assert!(stop.is_subclass_of(&ExceptionClass::exception()));
    }

    #[test]
    fn test_user_class_inheritance() {
        let app = ExceptionClass::new("AppError", &ExceptionClass::exception());
        let db = ExceptionClass::new("DbError", &app);

        assert!(db.is_subclass_of(&app));
        assert!(db.is_subclass_of(&ExceptionClass::base_exception()));
        assert!(!app.is_subclass_of(&db));
        assert_eq!(db.base(), Some(&app));
    }

    #[test]
    fn test_same_name_distinct_classes() {
        let a = ExceptionClass::new("Twin", &ExceptionClass::exception());
        let b = ExceptionClass::new("Twin", &ExceptionClass::exception());
        assert_ne!(a, b);
    }
}

#[cfg(test)]
mod instance_tests {
    use super::*;

    #[test]
    fn test_display_with_message() {
        let e = Exception::type_error("bad argument");
        assert_eq!(e.to_string(), "TypeError: bad argument");
        assert_eq!(e.repr(), "TypeError('bad argument')");
    }

    #[test]
    fn test_display_without_args() {
        let e = Exception::generator_exit();
        assert_eq!(e.to_string(), "GeneratorExit");
        assert_eq!(e.message(), "");
    }

    #[test]
    fn test_stop_iteration_value() {
        let e = Exception::stop_iteration(Value::Int(42));
        assert!(e.is_stop_iteration());
        assert_eq!(e.stop_value(), Value::Int(42));

        let bare = Exception::stop_iteration(Value::None);
        assert!(bare.args().is_empty());
        assert!(bare.stop_value().is_none());
    }

    #[test]
    fn test_cause_sets_suppress_context() {
        let original = Exception::stop_iteration(Value::None);
        let wrapper = Exception::runtime_error("wrapped");

        assert!(wrapper.set_cause(original.clone()));
        assert!(wrapper.suppress_context());
        assert!(wrapper.cause().is_some_and(|c| c.is_same(&original)));
        assert!(!wrapper.set_cause(Exception::value_error("second")));
    }

    #[test]
    fn test_error_source_is_cause() {
        use std::error::Error;

        let original = Exception::value_error("inner");
        let outer = Exception::runtime_error("outer");
        outer.set_cause(original);

        let source = outer.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("ValueError: inner"));
    }

    #[test]
    fn test_multiple_args_message() {
        let e = Exception::new(&ExceptionClass::value_error(), [Value::Int(1), Value::Int(2)]);
        assert_eq!(e.message(), "(1, 2)");
    }
}

#[cfg(test)]
mod traceback_tests {
    use super::*;

    #[test]
    fn test_traceback_chain() {
        let inner = Traceback::new("inner", 7, None);
        let outer = Traceback::new("outer", 3, Some(inner));

        assert_eq!(outer.depth(), 2);
        let names: Vec<&str> = outer.iter().map(|tb| tb.name()).collect();
        assert_eq!(names, ["outer", "inner"]);
        assert!(outer.format().contains("in inner, line 7"));
    }
}

#[cfg(test)]
mod pending_tests {
    use super::*;

    #[test]
    fn test_class_only_triple_instantiates_on_delivery() {
        let pending = PendingException::new(ExceptionClass::generator_exit());
        assert!(pending.value().is_none());

        let raised = pending.into_exception();
        assert!(raised.is_generator_exit());
        assert!(raised.traceback().is_none());
    }

    #[test]
    fn test_from_exception_keeps_identity() {
        let e = Exception::value_error("x");
        let pending = PendingException::from(e.clone());
        assert_eq!(pending.kind(), &ExceptionClass::value_error());
        assert!(pending.into_exception().is_same(&e));
    }

    #[test]
    fn test_traceback_attached_on_delivery() {
        let tb = Traceback::new("driver", 1, None);
        let pending = PendingException::from_parts(ExceptionClass::type_error(), None, Some(tb.clone()));
        let raised = pending.into_exception();
        assert!(raised.traceback().is_some_and(|t| t.is_same(&tb)));
    }

    #[test]
    fn test_pending_matches_base_classes() {
        let pending = PendingException::new(ExceptionClass::type_error());
        assert!(pending.matches(&ExceptionClass::exception()));
        assert!(!pending.matches(&ExceptionClass::generator_exit()));
    }
}
