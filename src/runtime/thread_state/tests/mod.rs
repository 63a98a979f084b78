//! Ambient state unit tests
//!
//! Error slot, handled-exception shadow, frame stack and unraisable channel.

use std::cell::RefCell;
use std::rc::Rc;

use crate::runtime::exception::{Exception, ExceptionClass};
use crate::runtime::frame::CodeObject;
use crate::runtime::thread_state::{self, UnraisableReport};
use crate::runtime::value::Value;

fn plain_code(name: &str) -> crate::runtime::frame::CodeRef {
    CodeObject::new(name, |_| Ok(Value::None)).into_ref()
}

#[cfg(test)]
mod error_slot_tests {
    use super::*;

    #[test]
    fn test_fetch_clears_slot() {
        thread_state::set_error(Exception::value_error("pending"));
        assert!(thread_state::error_occurred());

        let fetched = thread_state::fetch_error();
        assert!(fetched.is_some_and(|p| p.kind() == &ExceptionClass::value_error()));
        assert!(!thread_state::error_occurred());
    }

    #[test]
    fn test_restore_round_trip() {
        let original = Exception::type_error("kept");
        thread_state::set_error(original.clone());

        let saved = thread_state::fetch_error();
        thread_state::set_error(Exception::runtime_error("transient"));
        thread_state::restore_error(saved);

        let current = thread_state::current_error().map(|p| p.into_exception());
        assert!(current.is_some_and(|e| e.is_same(&original)));
        thread_state::restore_error(None);
    }
}

#[cfg(test)]
mod handled_tests {
    use super::*;

    #[test]
    fn test_set_handled_returns_previous() {
        let first = Exception::value_error("first");
        assert!(thread_state::set_handled_exception(Some(first.clone())).is_none());

        let previous = thread_state::set_handled_exception(None);
        assert!(previous.is_some_and(|e| e.is_same(&first)));
        assert!(thread_state::handled_exception().is_none());
    }
}

#[cfg(test)]
mod frame_stack_tests {
    use super::*;

    #[test]
    fn test_push_pop_links_back_pointers() {
        let base_depth = thread_state::frame_depth();

        let outer = thread_state::push_frame(plain_code("outer"));
        let inner = thread_state::push_frame(plain_code("inner"));

        assert_eq!(thread_state::frame_depth(), base_depth + 2);
        assert!(inner.back().is_some_and(|b| b.is_same(&outer)));

        let popped = thread_state::pop_frame();
        assert!(popped.is_some_and(|f| f.is_same(&inner)));
        assert!(inner.back().is_none());
        assert!(thread_state::current_frame().is_some_and(|f| f.is_same(&outer)));

        thread_state::pop_frame();
        assert_eq!(thread_state::frame_depth(), base_depth);
    }

    #[test]
    fn test_frame_line_tracking() {
        let code = CodeObject::new("lines", |_| Ok(Value::None))
            .with_first_line(10)
            .into_ref();
        let frame = thread_state::push_frame(code);
        assert_eq!(frame.lineno(), 10);
        frame.set_lineno(12);
        assert_eq!(format!("{:?}", frame), "<frame lines line 12>");
        thread_state::pop_frame();
    }
}

#[cfg(test)]
mod unraisable_tests {
    use super::*;

    #[test]
    fn test_hook_receives_report() {
        let seen: Rc<RefCell<Vec<UnraisableReport>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let previous = thread_state::set_unraisable_hook(Some(Box::new(move |report| {
            sink.borrow_mut().push(report.clone());
        })));

        thread_state::write_unraisable("<object>", Exception::runtime_error("lost"));

        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0].object, "<object>");
        assert_eq!(seen.borrow()[0].exception.to_string(), "RuntimeError: lost");

        thread_state::set_unraisable_hook(previous);
    }

    #[test]
    fn test_without_hook_does_not_touch_error_slot() {
        let previous = thread_state::set_unraisable_hook(None);
        thread_state::write_unraisable("<object>", Exception::runtime_error("logged"));
        assert!(!thread_state::error_occurred());
        thread_state::set_unraisable_hook(previous);
    }
}
