//! Uniform read/write handle over a command's flags.
//!
//! Commands store each flag behind its own mutex. A [`FlagAccessor`] holds
//! that lock for as long as it lives and tracks whether the flag has been
//! written during the current provider phase: the first [`FlagAccessor::set`]
//! resets the flag (clearing a sequence's default) and later calls append or
//! overwrite. Providers create fresh accessors for every phase.

use std::io::Read;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::context::Context;
use crate::error::Result;
use crate::flag::{self, Flag, ParseError, Value, default_text, format_flag, split};

pub(crate) type FlagSlot = Mutex<Box<dyn Flag>>;

pub(crate) fn lock(slot: &FlagSlot) -> MutexGuard<'_, Box<dyn Flag>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Case-insensitive comparison of a flag alias with a looked-up name.
pub(crate) fn same_name(alias: &str, name: &str) -> bool {
    alias == name || alias.to_lowercase() == name.trim().to_lowercase()
}

/// Locked handle over one flag.
///
/// Reading the same flag through the [`Context`] while an accessor is alive
/// blocks; drop the accessor first.
pub struct FlagAccessor<'a> {
    flag: MutexGuard<'a, Box<dyn Flag>>,
    touched: bool,
}

impl<'a> FlagAccessor<'a> {
    pub(crate) fn new(slot: &'a FlagSlot) -> Self {
        Self {
            flag: lock(slot),
            touched: false,
        }
    }

    /// Raw name list, such as `"log-level, l"`.
    pub fn name(&self) -> &str {
        self.flag.name()
    }

    /// Trimmed aliases.
    pub fn names(&self) -> Vec<&str> {
        split(self.flag.name()).collect()
    }

    /// First alias.
    pub fn primary_name(&self) -> &str {
        flag::primary_name(self.flag.name())
    }

    pub fn matches(&self, name: &str) -> bool {
        split(self.flag.name()).any(|alias| same_name(alias, name))
    }

    pub fn usage(&self) -> &str {
        self.flag.usage()
    }

    pub fn env_var(&self) -> &str {
        self.flag.env_var()
    }

    pub fn file_path(&self) -> &str {
        self.flag.file_path()
    }

    pub fn value(&self) -> Value {
        self.flag.value()
    }

    pub fn render(&self) -> String {
        self.flag.render()
    }

    /// Text shown as `(default: ...)` in help.
    pub fn default_text(&self) -> String {
        default_text(&**self.flag)
    }

    /// The flag rendered as one help line.
    pub fn format(&self) -> String {
        format_flag(&**self.flag)
    }

    /// Writes a token. The first write through this accessor resets the flag.
    pub fn set(&mut self, token: &str) -> std::result::Result<(), ParseError> {
        self.touch();
        self.flag.set(token)
    }

    /// Feeds a stream to the flag, resetting it first like [`FlagAccessor::set`].
    pub fn read_from(&mut self, reader: &mut dyn Read) -> std::result::Result<(), ParseError> {
        self.touch();
        self.flag.read_from(reader)
    }

    /// Puts back a snapshot taken earlier. Does not count as a write.
    pub fn restore(&mut self, value: Value) -> std::result::Result<(), ParseError> {
        self.flag.restore(value)
    }

    /// Whether this accessor has written the flag.
    pub fn is_set(&self) -> bool {
        self.touched
    }

    pub fn validate(&self, ctx: &Context<'_>) -> Result<()> {
        self.flag.validate(ctx)
    }

    pub fn hidden(&self) -> bool {
        self.flag.hidden()
    }

    pub fn required(&self) -> bool {
        self.flag.required()
    }

    pub fn is_bool_flag(&self) -> bool {
        self.flag.is_bool_flag()
    }

    pub fn is_sequence(&self) -> bool {
        self.flag.is_sequence()
    }

    pub fn is_document(&self) -> bool {
        self.flag.is_document()
    }

    fn touch(&mut self) {
        if !self.touched {
            self.flag.reset();
            self.touched = true;
        }
    }
}
