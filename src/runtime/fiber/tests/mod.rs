//! Fiber 单元测试
//!
//! 测试栈分配、切换与释放

use std::cell::Cell;
use std::rc::Rc;

use crate::runtime::fiber::{
    EntryPoint, Fiber, FiberError, FiberFactory, StackFiber, StackFiberFactory, Switch,
    DEFAULT_STACK_SIZE,
};

fn counting_entry() -> EntryPoint<i64, i64, String> {
    Box::new(|suspender, first| {
        let mut total = first;
        for _ in 0..2 {
            total += suspender.suspend(total);
        }
        format!("done:{}", total)
    })
}

#[cfg(test)]
mod switch_tests {
    use super::*;

    #[test]
    fn test_suspend_and_complete() {
        let mut fiber = StackFiber::create(64 * 1024, counting_entry()).unwrap();
        assert!(!fiber.is_started());

        assert!(matches!(fiber.switch_into(1).unwrap(), Switch::Suspended(1)));
        assert!(fiber.is_started());
        assert!(matches!(fiber.switch_into(10).unwrap(), Switch::Suspended(11)));

        match fiber.switch_into(100).unwrap() {
            Switch::Completed(s) => assert_eq!(s, "done:111"),
            Switch::Suspended(v) => panic!("unexpected suspension with {}", v),
        }
        assert!(fiber.is_completed());
    }

    #[test]
    fn test_switch_after_completion_errors() {
        let mut fiber: StackFiber<(), (), ()> = StackFiber::create(64 * 1024, Box::new(|_, _| ())).unwrap();
        assert!(matches!(fiber.switch_into(()).unwrap(), Switch::Completed(())));
        assert!(matches!(fiber.switch_into(()), Err(FiberError::Completed)));
    }

    #[test]
    fn test_switch_after_release_errors() {
        let mut fiber = StackFiber::create(64 * 1024, counting_entry()).unwrap();
        fiber.release();
        fiber.release();
        assert!(fiber.is_completed());
        assert!(matches!(fiber.switch_into(0), Err(FiberError::Released)));
    }
}

#[cfg(test)]
mod release_tests {
    use super::*;

    struct DropFlag(Rc<Cell<bool>>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.set(true);
        }
    }

    #[test]
    fn test_release_unwinds_suspended_stack() {
        let dropped = Rc::new(Cell::new(false));
        let flag = dropped.clone();
        let entry: EntryPoint<(), (), ()> = Box::new(move |suspender, _| {
            let _guard = DropFlag(flag);
            suspender.suspend(());
        });

        let mut fiber = StackFiber::create(64 * 1024, entry).unwrap();
        assert!(matches!(fiber.switch_into(()).unwrap(), Switch::Suspended(())));
        assert!(!dropped.get());

        fiber.release();
        assert!(dropped.get());
    }
}

#[cfg(test)]
mod factory_tests {
    use super::*;

    #[test]
    fn test_default_factory_stack_size() {
        assert_eq!(StackFiberFactory::default().stack_size(), DEFAULT_STACK_SIZE);
    }

    #[test]
    fn test_factory_creates_working_fiber() {
        let factory = StackFiberFactory::new(128 * 1024);
        let mut fiber = FiberFactory::<i64, i64, String>::create(&factory, counting_entry()).unwrap();
        assert!(matches!(fiber.switch_into(5).unwrap(), Switch::Suspended(5)));
    }

    #[test]
    fn test_allocation_error_message() {
        let err = FiberError::StackAllocation {
            size: 4096,
            source: std::io::Error::new(std::io::ErrorKind::OutOfMemory, "no memory"),
        };
        assert!(err.to_string().contains("4096 bytes"));
    }
}
