//! Traceback chains

use std::fmt;
use std::rc::Rc;

use crate::runtime::frame::Frame;

struct TracebackEntry {
    name: Rc<str>,
    lineno: u32,
    next: Option<Traceback>,
}

/// A linked traceback, outermost entry first.
#[derive(Clone)]
pub struct Traceback(Rc<TracebackEntry>);

impl Traceback {
    pub fn new(
        name: impl AsRef<str>,
        lineno: u32,
        next: Option<Traceback>,
    ) -> Self {
        Traceback(Rc::new(TracebackEntry {
            name: Rc::from(name.as_ref()),
            lineno,
            next,
        }))
    }

    /// Entry for `frame` at its current line, in front of `next`.
    pub fn from_frame(
        frame: &Frame,
        next: Option<Traceback>,
    ) -> Self {
        Traceback(Rc::new(TracebackEntry {
            name: frame.code().qualname_rc(),
            lineno: frame.lineno(),
            next,
        }))
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[inline]
    pub fn lineno(&self) -> u32 {
        self.0.lineno
    }

    #[inline]
    pub fn next(&self) -> Option<&Traceback> {
        self.0.next.as_ref()
    }

    /// Iterate entries from outermost to innermost.
    pub fn iter(&self) -> impl Iterator<Item = &Traceback> {
        std::iter::successors(Some(self), |tb| tb.next())
    }

    pub fn depth(&self) -> usize {
        self.iter().count()
    }

    pub fn is_same(
        &self,
        other: &Traceback,
    ) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Render in the familiar "most recent call last" layout.
    pub fn format(&self) -> String {
        let mut out = String::from("Traceback (most recent call last):\n");
        for entry in self.iter() {
            out.push_str(&format!("  in {}, line {}\n", entry.name(), entry.lineno()));
        }
        out
    }
}

impl fmt::Debug for Traceback {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|tb| format!("{}:{}", tb.name(), tb.lineno())))
            .finish()
    }
}
