//! Ordered, nestable parameter storage that flattens into an argument vector.

use std::fmt;

/// A single command-line flag with an optional value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    name: String,
    value: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// A bare flag such as `-y` or `-an`.
    pub fn flag(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    fn flatten_into(&self, args: &mut Vec<String>) {
        push_nonempty(args, &self.name);
        if let Some(value) = &self.value {
            push_nonempty(args, value);
        }
    }

    fn filter_item(&self) -> String {
        match self.value.as_deref() {
            Some(value) if !value.is_empty() => format!("{}={}", self.name, value),
            _ => self.name.clone(),
        }
    }
}

/// One slot of a container: a parameter or a nested container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Parameter(Parameter),
    Container(ParameterContainer),
}

impl From<Parameter> for Entry {
    fn from(parameter: Parameter) -> Self {
        Entry::Parameter(parameter)
    }
}

impl From<ParameterContainer> for Entry {
    fn from(container: ParameterContainer) -> Self {
        Entry::Container(container)
    }
}

/// Decides where a container's own tokens go when it is flattened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerKind {
    Plain,
    /// `<selector> <name>` ahead of the entries.
    Codec { selector: &'static str, name: String },
    /// Entries joined with `,` as the value of a single `<selector>` flag.
    Filter { selector: &'static str },
    /// Entries followed by `-i <path>`.
    Input { path: String },
    /// Entries followed by `<path>`.
    Output { path: String },
    /// `<binary>` ahead of the entries.
    Command { binary: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterContainer {
    kind: ContainerKind,
    entries: Vec<Entry>,
}

impl Default for ParameterContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterContainer {
    pub fn new() -> Self {
        Self::with_kind(ContainerKind::Plain)
    }

    pub(crate) fn with_kind(kind: ContainerKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    pub fn kind(&self) -> &ContainerKind {
        &self.kind
    }

    /// Appends `name value`.
    pub fn add(&mut self, name: impl Into<String>, value: impl FormatArg) -> &mut Self {
        self.entries
            .push(Entry::Parameter(Parameter::new(name, value.into_arg())));
        self
    }

    /// Appends a bare flag.
    pub fn add_flag(&mut self, name: impl Into<String>) -> &mut Self {
        self.entries.push(Entry::Parameter(Parameter::flag(name)));
        self
    }

    /// Appends one parameter whose value is built by [`format_parameter`].
    pub fn add_formatted<I>(
        &mut self,
        name: impl Into<String>,
        positional: I,
        named: &[(&str, NamedValue)],
    ) -> &mut Self
    where
        I: IntoIterator<Item = Option<String>>,
    {
        let value = format_parameter(positional, named);
        self.entries
            .push(Entry::Parameter(Parameter::new(name, Some(value))));
        self
    }

    /// Nests another container after the current entries.
    pub fn append(&mut self, container: impl Into<ParameterContainer>) -> &mut Self {
        self.entries.push(Entry::Container(container.into()));
        self
    }

    pub fn push(&mut self, entry: impl Into<Entry>) -> &mut Self {
        self.entries.push(entry.into());
        self
    }

    /// Inserts at `index` among the top-level entries.
    ///
    /// Panics if `index > len`, like [`Vec::insert`].
    pub fn insert(&mut self, index: usize, entry: impl Into<Entry>) {
        self.entries.insert(index, entry.into());
    }

    /// Removes the top-level entry at `index`, or `None` when out of range.
    pub fn remove(&mut self, index: usize) -> Option<Entry> {
        if index < self.entries.len() {
            Some(self.entries.remove(index))
        } else {
            None
        }
    }

    pub fn pop(&mut self) -> Option<Entry> {
        self.entries.pop()
    }

    pub fn position(&self, entry: &Entry) -> Option<usize> {
        self.entries.iter().position(|candidate| candidate == entry)
    }

    pub fn contains(&self, entry: &Entry) -> bool {
        self.entries.contains(entry)
    }

    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Depth-first expansion into argument strings, skipping empty values.
    pub fn flatten(&self) -> Vec<String> {
        let mut args = Vec::new();
        self.flatten_into(&mut args);
        args
    }

    fn flatten_into(&self, args: &mut Vec<String>) {
        match &self.kind {
            ContainerKind::Plain => self.flatten_entries(args),
            ContainerKind::Codec { selector, name } => {
                args.push((*selector).to_string());
                push_nonempty(args, name);
                self.flatten_entries(args);
            }
            ContainerKind::Filter { selector } => {
                let chain = self.filter_chain();
                if !chain.is_empty() {
                    args.push((*selector).to_string());
                    args.push(chain);
                }
            }
            ContainerKind::Input { path } => {
                self.flatten_entries(args);
                args.push("-i".to_string());
                push_nonempty(args, path);
            }
            ContainerKind::Output { path } => {
                self.flatten_entries(args);
                push_nonempty(args, path);
            }
            ContainerKind::Command { binary } => {
                push_nonempty(args, binary);
                self.flatten_entries(args);
            }
        }
    }

    fn flatten_entries(&self, args: &mut Vec<String>) {
        for entry in &self.entries {
            match entry {
                Entry::Parameter(parameter) => parameter.flatten_into(args),
                Entry::Container(container) => container.flatten_into(args),
            }
        }
    }

    /// The entries rendered as `name` / `name=value` and joined with `,`.
    pub fn filter_chain(&self) -> String {
        let mut items = Vec::new();
        self.collect_filter_items(&mut items);
        items.join(",")
    }

    fn collect_filter_items(&self, items: &mut Vec<String>) {
        for entry in &self.entries {
            match entry {
                Entry::Parameter(parameter) => items.push(parameter.filter_item()),
                Entry::Container(container) => container.collect_filter_items(items),
            }
        }
    }
}

impl fmt::Display for ParameterContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell_words::join(self.flatten()))
    }
}

fn push_nonempty(args: &mut Vec<String>, value: &str) {
    if !value.is_empty() {
        args.push(value.to_string());
    }
}

/// Conversion into an optional positional argument. `None` is skipped by the
/// formatter; every other value, zero included, is stringified.
pub trait FormatArg {
    fn into_arg(self) -> Option<String>;
}

macro_rules! format_arg_display {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FormatArg for $ty {
                fn into_arg(self) -> Option<String> {
                    Some(self.to_string())
                }
            }
        )*
    };
}

format_arg_display!(
    i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, char, &str, &String, String,
);

impl<T: FormatArg> FormatArg for Option<T> {
    fn into_arg(self) -> Option<String> {
        self.and_then(FormatArg::into_arg)
    }
}

/// A keyword value, classified up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamedValue {
    Absent,
    Scalar(String),
    Sequence(Vec<String>),
}

impl NamedValue {
    /// Absent, empty strings and empty sequences render as a bare name.
    pub fn is_falsy(&self) -> bool {
        match self {
            NamedValue::Absent => true,
            NamedValue::Scalar(value) => value.is_empty(),
            NamedValue::Sequence(values) => values.is_empty(),
        }
    }
}

impl From<&str> for NamedValue {
    fn from(value: &str) -> Self {
        NamedValue::Scalar(value.to_string())
    }
}

impl From<String> for NamedValue {
    fn from(value: String) -> Self {
        NamedValue::Scalar(value)
    }
}

impl From<Vec<String>> for NamedValue {
    fn from(values: Vec<String>) -> Self {
        NamedValue::Sequence(values)
    }
}

impl From<&[&str]> for NamedValue {
    fn from(values: &[&str]) -> Self {
        NamedValue::Sequence(values.iter().map(|value| value.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for NamedValue {
    fn from(values: [&str; N]) -> Self {
        NamedValue::from(&values[..])
    }
}

impl<T: Into<NamedValue>> From<Option<T>> for NamedValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(NamedValue::Absent, Into::into)
    }
}

/// Builds one flag value from positional and keyword arguments.
///
/// Positional values come first, `None` entries are dropped. Keyword values
/// follow as `name`, `name=value` or `name=a:b`. Everything is joined with
/// `:`, and the whole string is double-quoted when any keyword was given.
pub fn format_parameter<I>(positional: I, named: &[(&str, NamedValue)]) -> String
where
    I: IntoIterator<Item = Option<String>>,
{
    let mut tokens: Vec<String> = positional.into_iter().flatten().collect();

    for (name, value) in named {
        let token = match value {
            value if value.is_falsy() => (*name).to_string(),
            NamedValue::Scalar(value) => format!("{name}={value}"),
            NamedValue::Sequence(values) => format!("{name}={}", values.join(":")),
            NamedValue::Absent => (*name).to_string(),
        };
        tokens.push(token);
    }

    let joined = tokens.join(":");
    if named.is_empty() {
        joined
    } else {
        format!("\"{joined}\"")
    }
}

/// Deref/From plumbing for the typed container newtypes.
macro_rules! container_newtype {
    ($ty:ident) => {
        impl ::std::ops::Deref for $ty {
            type Target = $crate::core::parameters::ParameterContainer;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl ::std::ops::DerefMut for $ty {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }

        impl From<$ty> for $crate::core::parameters::ParameterContainer {
            fn from(value: $ty) -> Self {
                value.0
            }
        }

        impl From<$ty> for $crate::core::parameters::Entry {
            fn from(value: $ty) -> Self {
                $crate::core::parameters::Entry::Container(value.0)
            }
        }
    };
}

pub(crate) use container_newtype;
