//! Reconciliation Engine - expands an element tree into a snapshot.
//!
//! One [`RenderPass`] walks the element tree depth first:
//! 1. Primitives become primitive snapshot nodes
//! 2. Host elements become host nodes; child `i` renders at `path + [i]`
//! 3. Components are looked up against the committed tree to decide whether
//!    this is their first render at the path, get their hook record, run, and
//!    their output renders at `path + [0]`
//!
//! Effects registered by components are collected, not run. The caller runs
//! them after the cycle's patches are applied.

use std::collections::HashSet;
use std::rc::{Rc, Weak};

use crate::element::{ComponentElement, Element, HostElement, Primitive};
use crate::error::{Error, Result};
use crate::hooks::{HookTable, Hooks, PendingEffect};
use crate::path::Path;
use crate::pipeline::config::RuntimeConfig;
use crate::pipeline::scheduler::Scheduler;

use super::vdom::{NodeKind, NodeType, SnapshotNode, Vdom};

/// What a finished pass leaves behind besides the tree.
pub struct RenderOutput {
    pub root: Rc<SnapshotNode>,
    /// Effects in registration order.
    pub effects: Vec<PendingEffect>,
    /// Paths rendered as components this pass.
    pub components: HashSet<Path>,
}

/// State of one render pass.
pub struct RenderPass<'a> {
    vdom: &'a Vdom,
    hooks: &'a mut HookTable,
    scheduler: Weak<Scheduler>,
    config: &'a RuntimeConfig,
    effects: Vec<PendingEffect>,
    components: HashSet<Path>,
}

impl<'a> RenderPass<'a> {
    pub fn new(
        vdom: &'a Vdom,
        hooks: &'a mut HookTable,
        scheduler: Weak<Scheduler>,
        config: &'a RuntimeConfig,
    ) -> Self {
        Self {
            vdom,
            hooks,
            scheduler,
            config,
            effects: Vec::new(),
            components: HashSet::new(),
        }
    }

    /// Render `root` at the root path and finish the pass.
    pub fn run(mut self, root: &Element) -> Result<RenderOutput> {
        let root = self.render(root, Path::root())?;
        Ok(RenderOutput {
            root,
            effects: self.effects,
            components: self.components,
        })
    }

    /// Render `element` at `path`.
    pub fn render(&mut self, element: &Element, path: Path) -> Result<Rc<SnapshotNode>> {
        match element {
            Element::Primitive(value) => render_primitive(value, path),
            Element::Host(host) => self.render_host(host, path),
            Element::Component(component) => self.render_component(component, path),
        }
    }

    /// Whether the committed tree has a different node (or none) at `path`.
    fn is_first_render_at(&self, path: &Path, node_type: &NodeType) -> bool {
        self.vdom
            .previous_at(path)
            .is_none_or(|previous| previous.node_type() != *node_type)
    }

    fn render_host(&mut self, host: &HostElement, path: Path) -> Result<Rc<SnapshotNode>> {
        let mut children = Vec::with_capacity(host.children.len());
        for (index, child) in host.children.iter().enumerate() {
            children.push(self.render(child, path.append(index))?);
        }
        Ok(Rc::new(SnapshotNode {
            path,
            kind: NodeKind::Host {
                tag: host.tag.clone(),
                props: host.props.clone(),
            },
            children,
        }))
    }

    fn render_component(&mut self, component: &ComponentElement, path: Path) -> Result<Rc<SnapshotNode>> {
        let ty = component.component_type();
        let first_render = self.is_first_render_at(&path, &NodeType::Component(ty));
        self.components.insert(path.clone());

        let output = {
            let (record, fresh) = self.hooks.register(&path, ty, first_render);
            let mut hooks = Hooks::new(&path, record, fresh, &mut self.effects, self.scheduler.clone());
            let output = component.call(&mut hooks);
            match hooks.finish() {
                None => output,
                Some(detail) if self.config.strict_hooks => {
                    return Err(Error::HookOrder {
                        path,
                        component: ty.name(),
                        detail,
                    });
                }
                Some(detail) => {
                    tracing::warn!(%path, component = ty.name(), %detail, "hook order violation; resetting hook state");
                    self.hooks.reset(&path);
                    output
                }
            }
        };

        let child = self.render(&output, path.append(0))?;
        Ok(Rc::new(SnapshotNode {
            path,
            kind: NodeKind::Component(ty),
            children: vec![child],
        }))
    }
}

fn render_primitive(value: &Primitive, path: Path) -> Result<Rc<SnapshotNode>> {
    if !value.is_renderable() {
        return Err(Error::UnrenderableValue {
            path,
            value: value.to_string(),
        });
    }
    Ok(Rc::new(SnapshotNode::primitive(path, value.clone())))
}

/// Render `root` against `vdom.previous` and store the result as `vdom.current`.
///
/// On failure `vdom` is left untouched. `output.root.resolve()` is the node
/// the host sees at the root.
pub fn render(
    root: &Element,
    vdom: &mut Vdom,
    hooks: &mut HookTable,
    scheduler: Weak<Scheduler>,
    config: &RuntimeConfig,
) -> Result<RenderOutput> {
    let output = RenderPass::new(vdom, hooks, scheduler, config).run(root)?;
    vdom.set_current(output.root.clone());
    Ok(output)
}

// =============================================================================
// Tests
// =============================================================================
