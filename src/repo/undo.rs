//! Compensation stack for multi-step operations.
//!
//! Each step of a create pushes its compensating action; on failure the
//! stack is unwound in reverse order. On success the stack is simply
//! dropped; compensations never run implicitly.

type Compensation<'a> = Box<dyn FnOnce() -> anyhow::Result<()> + 'a>;

#[derive(Default)]
pub struct UndoStack<'a> {
    actions: Vec<(String, Compensation<'a>)>,
}

impl<'a> UndoStack<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a compensation for a step that just succeeded.
    pub fn push(
        &mut self,
        label: impl Into<String>,
        action: impl FnOnce() -> anyhow::Result<()> + 'a,
    ) {
        self.actions.push((label.into(), Box::new(action)));
    }

    /// Run all compensations in reverse registration order.
    ///
    /// A failing compensation is logged and does not stop the unwind.
    pub fn unwind(self) {
        for (label, action) in self.actions.into_iter().rev() {
            log::debug!("rolling back: {label}");
            if let Err(e) = action() {
                log::warn!("rollback step '{label}' failed: {e:#}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_unwind_runs_in_reverse_order() {
        let order = RefCell::new(Vec::new());
        let mut undo = UndoStack::new();
        for i in 0..3 {
            let order = &order;
            undo.push(format!("step-{i}"), move || {
                order.borrow_mut().push(i);
                Ok(())
            });
        }
        undo.unwind();
        assert_eq!(*order.borrow(), vec![2, 1, 0]);
    }

    #[test]
    fn test_failed_compensation_does_not_stop_unwind() {
        let order = RefCell::new(Vec::new());
        let mut undo = UndoStack::new();
        undo.push("first", || {
            order.borrow_mut().push(1);
            Ok(())
        });
        undo.push("failing", || anyhow::bail!("boom"));
        undo.unwind();
        assert_eq!(*order.borrow(), vec![1]);
    }

    #[test]
    fn test_drop_without_unwind_runs_nothing() {
        let order = RefCell::new(Vec::new());
        {
            let mut undo = UndoStack::new();
            undo.push("step", || {
                order.borrow_mut().push(1);
                Ok(())
            });
        }
        assert!(order.borrow().is_empty());
    }
}
