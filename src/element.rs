//! Element model - the input tree of a render pass.
//!
//! An [`Element`] is one of:
//! - [`Primitive`] - text, number, boolean, null or undefined
//! - [`HostElement`] - a renderer-defined tag with props and children
//! - [`ComponentElement`] - a function from props to one element
//!
//! # Example
//!
//! ```ignore
//! use spark_vdom::{Element, Hooks, host};
//!
//! fn greeting(name: &String, _hooks: &mut Hooks) -> Element {
//!     host("p").prop("class", "greeting").child(format!("Hello {name}")).into()
//! }
//!
//! let tree: Element = host("div")
//!     .prop("id", "app")
//!     .child(Element::component(greeting, "world".to_string()))
//!     .into();
//! ```

use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::hooks::Hooks;

/// Reserved prop name for children. Never stored or diffed as a prop.
pub const CHILDREN_KEY: &str = "children";

// =============================================================================
// Primitive
// =============================================================================

/// A primitive value rendered as text or as nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Text(String),
    Number(f64),
    Bool(bool),
    Null,
    Undefined,
}

impl Primitive {
    /// Text shown by the host, or `None` when the value renders nothing.
    pub fn display_text(&self) -> Option<String> {
        match self {
            Primitive::Text(s) => Some(s.clone()),
            Primitive::Number(n) => Some(format_number(*n)),
            Primitive::Bool(_) | Primitive::Null | Primitive::Undefined => None,
        }
    }

    /// Whether a host can represent this value.
    pub fn is_renderable(&self) -> bool {
        match self {
            Primitive::Number(n) => n.is_finite(),
            _ => true,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Text(s) => write!(f, "{s:?}"),
            Primitive::Number(n) => write!(f, "{n}"),
            Primitive::Bool(b) => write!(f, "{b}"),
            Primitive::Null => f.write_str("null"),
            Primitive::Undefined => f.write_str("undefined"),
        }
    }
}

// =============================================================================
// Props
// =============================================================================

/// Event handler prop. Receives the event payload from the host.
///
/// Two handlers are equal only if they are the same allocation, so a closure
/// recreated on every render always shows up as a prop change.
#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn(&PropValue)>);

impl EventHandler {
    pub fn new(handler: impl Fn(&PropValue) + 'static) -> Self {
        Self(Rc::new(handler))
    }

    /// Invoke the handler with an event payload.
    pub fn call(&self, event: &PropValue) {
        (self.0)(event)
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventHandler(..)")
    }
}

/// A host prop value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Str(String),
    Number(f64),
    Bool(bool),
    Null,
    Handler(EventHandler),
}

impl PropValue {
    /// Attribute text for hosts that serialize props. Handlers have none.
    pub fn as_attribute(&self) -> Option<String> {
        match self {
            PropValue::Str(s) => Some(s.clone()),
            PropValue::Number(n) => Some(format_number(*n)),
            PropValue::Bool(b) => Some(b.to_string()),
            PropValue::Null => Some("null".to_string()),
            PropValue::Handler(_) => None,
        }
    }

    pub fn as_handler(&self) -> Option<&EventHandler> {
        match self {
            PropValue::Handler(h) => Some(h),
            _ => None,
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Number(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Number(f64::from(value))
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<EventHandler> for PropValue {
    fn from(value: EventHandler) -> Self {
        PropValue::Handler(value)
    }
}

/// Host props, ordered by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props(BTreeMap<String, PropValue>);

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a prop. `children` is reserved and silently ignored.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PropValue>) {
        let name = name.into();
        if name == CHILDREN_KEY {
            return;
        }
        self.0.insert(name, value.into());
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<PropValue>> FromIterator<(K, V)> for Props {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Props::new();
        for (k, v) in iter {
            props.insert(k, v);
        }
        props
    }
}

// =============================================================================
// Host Element
// =============================================================================

/// A renderer-defined node: tag, props and ordered children.
#[derive(Debug, Clone)]
pub struct HostElement {
    pub tag: String,
    pub props: Props,
    pub children: Vec<Element>,
}

/// Start building a host element.
pub fn host(tag: impl Into<String>) -> HostElement {
    HostElement::new(tag)
}

impl HostElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            props: Props::new(),
            children: Vec::new(),
        }
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.insert(name, value);
        self
    }

    /// Attach an event handler prop.
    pub fn on(self, name: impl Into<String>, handler: impl Fn(&PropValue) + 'static) -> Self {
        self.prop(name, EventHandler::new(handler))
    }

    pub fn child(mut self, child: impl Into<Element>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Element>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }
}

// =============================================================================
// Component Element
// =============================================================================

/// Identity of a component function.
///
/// Two components are the same type when their function types are the same,
/// regardless of the props they were created with.
#[derive(Debug, Clone, Copy)]
pub struct ComponentType {
    id: TypeId,
    name: &'static str,
}

impl ComponentType {
    pub fn of<F: 'static>() -> Self {
        Self {
            id: TypeId::of::<F>(),
            name: std::any::type_name::<F>(),
        }
    }

    /// Type name of the component function, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentType {}

type RenderFn = Rc<dyn Fn(&mut Hooks<'_>) -> Element>;

/// A function component bound to its props.
#[derive(Clone)]
pub struct ComponentElement {
    ty: ComponentType,
    render: RenderFn,
}

impl ComponentElement {
    pub fn new<P, F>(render: F, props: P) -> Self
    where
        P: 'static,
        F: Fn(&P, &mut Hooks<'_>) -> Element + 'static,
    {
        let ty = ComponentType::of::<F>();
        let render: RenderFn = Rc::new(move |hooks: &mut Hooks<'_>| render(&props, hooks));
        Self { ty, render }
    }

    pub fn component_type(&self) -> ComponentType {
        self.ty
    }

    /// Run the component body against a hook context.
    pub fn call(&self, hooks: &mut Hooks<'_>) -> Element {
        (self.render)(hooks)
    }
}

impl fmt::Debug for ComponentElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentElement").field("type", &self.ty.name).finish()
    }
}

// =============================================================================
// Element
// =============================================================================

/// A node of the input tree.
#[derive(Debug, Clone)]
pub enum Element {
    Primitive(Primitive),
    Host(HostElement),
    Component(ComponentElement),
}

impl Element {
    pub fn text(value: impl Into<String>) -> Self {
        Element::Primitive(Primitive::Text(value.into()))
    }

    pub fn number(value: f64) -> Self {
        Element::Primitive(Primitive::Number(value))
    }

    pub fn null() -> Self {
        Element::Primitive(Primitive::Null)
    }

    pub fn component<P, F>(render: F, props: P) -> Self
    where
        P: 'static,
        F: Fn(&P, &mut Hooks<'_>) -> Element + 'static,
    {
        Element::Component(ComponentElement::new(render, props))
    }
}

impl From<Primitive> for Element {
    fn from(value: Primitive) -> Self {
        Element::Primitive(value)
    }
}

impl From<HostElement> for Element {
    fn from(value: HostElement) -> Self {
        Element::Host(value)
    }
}

impl From<ComponentElement> for Element {
    fn from(value: ComponentElement) -> Self {
        Element::Component(value)
    }
}

impl From<&str> for Element {
    fn from(value: &str) -> Self {
        Element::text(value)
    }
}

impl From<String> for Element {
    fn from(value: String) -> Self {
        Element::Primitive(Primitive::Text(value))
    }
}

impl From<f64> for Element {
    fn from(value: f64) -> Self {
        Element::number(value)
    }
}

impl From<i32> for Element {
    fn from(value: i32) -> Self {
        Element::number(f64::from(value))
    }
}

impl From<i64> for Element {
    fn from(value: i64) -> Self {
        Element::number(value as f64)
    }
}

impl From<bool> for Element {
    fn from(value: bool) -> Self {
        Element::Primitive(Primitive::Bool(value))
    }
}

impl From<()> for Element {
    fn from(_: ()) -> Self {
        Element::Primitive(Primitive::Undefined)
    }
}

impl<T: Into<Element>> From<Option<T>> for Element {
    fn from(value: Option<T>) -> Self {
        value.map_or(Element::null(), Into::into)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn first(_: &(), _: &mut Hooks<'_>) -> Element {
        Element::null()
    }

    fn second(_: &(), _: &mut Hooks<'_>) -> Element {
        Element::null()
    }

    #[test]
    fn test_component_identity_follows_function() {
        let a = ComponentElement::new(first, ());
        let b = ComponentElement::new(first, ());
        let c = ComponentElement::new(second, ());
        assert_eq!(a.component_type(), b.component_type());
        assert_ne!(a.component_type(), c.component_type());
    }

    #[test]
    fn test_children_prop_is_reserved() {
        let el = host("div").prop("id", "a").prop("children", "nope");
        assert!(el.props.contains("id"));
        assert!(!el.props.contains(CHILDREN_KEY));
    }

    #[test]
    fn test_primitive_display_text() {
        assert_eq!(Primitive::Number(3.0).display_text(), Some("3".to_string()));
        assert_eq!(Primitive::Number(1.5).display_text(), Some("1.5".to_string()));
        assert_eq!(Primitive::Text("hi".into()).display_text(), Some("hi".to_string()));
        assert_eq!(Primitive::Bool(true).display_text(), None);
        assert_eq!(Primitive::Null.display_text(), None);
    }

    #[test]
    fn test_non_finite_numbers_are_unrenderable() {
        assert!(!Primitive::Number(f64::NAN).is_renderable());
        assert!(!Primitive::Number(f64::INFINITY).is_renderable());
        assert!(Primitive::Number(-2.0).is_renderable());
        assert!(Primitive::Undefined.is_renderable());
    }

    #[test]
    fn test_handler_equality_is_identity() {
        let h = EventHandler::new(|_| {});
        let same = h.clone();
        let other = EventHandler::new(|_| {});
        assert_eq!(PropValue::Handler(h.clone()), PropValue::Handler(same));
        assert_ne!(PropValue::Handler(h), PropValue::Handler(other));
    }

    #[test]
    fn test_option_into_element() {
        let none: Option<&str> = None;
        assert!(matches!(Element::from(none), Element::Primitive(Primitive::Null)));
        assert!(matches!(Element::from(Some("x")), Element::Primitive(Primitive::Text(_))));
    }
}
