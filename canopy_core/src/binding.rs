// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Explicit property access for view-model binding.
//!
//! A bindable view declares its properties as a table of
//! [`PropertyAccessor`]s; [`Bindable`] is then implemented by looking names
//! up in that table. [`NodeBinding`] exposes a shell node this way.

use alloc::string::{String, ToString};
use core::fmt;

use crate::error::SceneError;
use crate::geometry::Rect;
use crate::scene::{NodeId, ShellTree};

/// A dynamically typed property value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyValue {
    /// A flag.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A string.
    Text(String),
}

/// Named property access on a view.
pub trait Bindable {
    /// Reads a property; `None` if the name is unknown or the value is
    /// unavailable.
    fn get_property(&self, name: &str) -> Option<PropertyValue>;

    /// Writes a property.
    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), SceneError>;
}

/// Getter for one property of `T`.
pub type Getter<T> = fn(&T) -> Option<PropertyValue>;

/// Setter for one property of `T`.
pub type Setter<T> = fn(&mut T, PropertyValue) -> Result<(), SceneError>;

/// One entry of a property table.
pub struct PropertyAccessor<T> {
    /// Property name.
    pub name: &'static str,
    /// Reads the property.
    pub get: Getter<T>,
    /// Writes the property; `None` for read-only properties.
    pub set: Option<Setter<T>>,
}

impl<T> PropertyAccessor<T> {
    /// A property that can be read and written.
    #[must_use]
    pub const fn read_write(name: &'static str, get: Getter<T>, set: Setter<T>) -> Self {
        Self {
            name,
            get,
            set: Some(set),
        }
    }

    /// A property that can only be read.
    #[must_use]
    pub const fn read_only(name: &'static str, get: Getter<T>) -> Self {
        Self {
            name,
            get,
            set: None,
        }
    }
}

impl<T> fmt::Debug for PropertyAccessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyAccessor")
            .field("name", &self.name)
            .field("writable", &self.set.is_some())
            .finish_non_exhaustive()
    }
}

/// Reads `name` from `target` through `table`.
pub fn get_from<T>(table: &[PropertyAccessor<T>], target: &T, name: &str) -> Option<PropertyValue> {
    let accessor = table.iter().find(|a| a.name == name)?;
    (accessor.get)(target)
}

/// Writes `name` on `target` through `table`.
pub fn set_on<T>(
    table: &[PropertyAccessor<T>],
    target: &mut T,
    name: &str,
    value: PropertyValue,
) -> Result<(), SceneError> {
    let accessor = table
        .iter()
        .find(|a| a.name == name)
        .ok_or_else(|| SceneError::UnknownProperty(name.to_string()))?;
    let set = accessor
        .set
        .ok_or(SceneError::ReadOnlyProperty(accessor.name))?;
    set(target, value)
}

/// A shell node viewed as a bindable object.
///
/// Properties: `x`, `y`, `width`, `height` (int), `visible` (bool), and the
/// read-only `destroyed` (bool). Writes go through the request API, so the
/// listener policy decides whether they take effect.
#[derive(Debug)]
pub struct NodeBinding<'a> {
    tree: &'a mut ShellTree,
    node: NodeId,
}

impl<'a> NodeBinding<'a> {
    /// Binds `node` of `tree`.
    pub fn new(tree: &'a mut ShellTree, node: NodeId) -> Self {
        Self { tree, node }
    }

    /// Returns the bound node.
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The property table of a node.
    #[must_use]
    pub fn properties() -> [PropertyAccessor<Self>; 6] {
        [
            PropertyAccessor::read_write("x", Self::x, Self::set_x),
            PropertyAccessor::read_write("y", Self::y, Self::set_y),
            PropertyAccessor::read_write("width", Self::width, Self::set_width),
            PropertyAccessor::read_write("height", Self::height, Self::set_height),
            PropertyAccessor::read_write("visible", Self::visible, Self::set_visible),
            PropertyAccessor::read_only("destroyed", Self::destroyed),
        ]
    }

    fn x(&self) -> Option<PropertyValue> {
        let shape = self.tree.shape(self.node)?;
        Some(PropertyValue::Int(shape.x.into()))
    }

    fn y(&self) -> Option<PropertyValue> {
        let shape = self.tree.shape(self.node)?;
        Some(PropertyValue::Int(shape.y.into()))
    }

    fn width(&self) -> Option<PropertyValue> {
        let shape = self.tree.shape(self.node)?;
        Some(PropertyValue::Int(shape.width.into()))
    }

    fn height(&self) -> Option<PropertyValue> {
        let shape = self.tree.shape(self.node)?;
        Some(PropertyValue::Int(shape.height.into()))
    }

    fn visible(&self) -> Option<PropertyValue> {
        self.tree.visible(self.node).map(PropertyValue::Bool)
    }

    fn destroyed(&self) -> Option<PropertyValue> {
        Some(PropertyValue::Bool(self.tree.is_destroyed(self.node)))
    }

    fn set_x(&mut self, value: PropertyValue) -> Result<(), SceneError> {
        let x = coord("x", &value)?;
        let shape = self.shape()?;
        self.tree.request_move(self.node, x, shape.y)
    }

    fn set_y(&mut self, value: PropertyValue) -> Result<(), SceneError> {
        let y = coord("y", &value)?;
        let shape = self.shape()?;
        self.tree.request_move(self.node, shape.x, y)
    }

    fn set_width(&mut self, value: PropertyValue) -> Result<(), SceneError> {
        let width = extent("width", &value)?;
        let shape = self.shape()?;
        self.tree.request_resize(self.node, width, shape.height)
    }

    fn set_height(&mut self, value: PropertyValue) -> Result<(), SceneError> {
        let height = extent("height", &value)?;
        let shape = self.shape()?;
        self.tree.request_resize(self.node, shape.width, height)
    }

    fn set_visible(&mut self, value: PropertyValue) -> Result<(), SceneError> {
        match value {
            PropertyValue::Bool(true) => self.tree.request_show(self.node),
            PropertyValue::Bool(false) => self.tree.request_hide(self.node),
            _ => Err(SceneError::PropertyType {
                name: "visible",
                expected: "bool",
            }),
        }
    }

    fn shape(&self) -> Result<Rect, SceneError> {
        self.tree
            .shape(self.node)
            .ok_or(SceneError::Destroyed(self.node))
    }
}

fn coord(name: &'static str, value: &PropertyValue) -> Result<i32, SceneError> {
    let err = SceneError::PropertyType {
        name,
        expected: "int",
    };
    match *value {
        PropertyValue::Int(v) => i32::try_from(v).map_err(|_| err),
        _ => Err(err),
    }
}

fn extent(name: &'static str, value: &PropertyValue) -> Result<u32, SceneError> {
    let err = SceneError::PropertyType {
        name,
        expected: "non-negative int",
    };
    match *value {
        PropertyValue::Int(v) => u32::try_from(v).map_err(|_| err),
        _ => Err(err),
    }
}

impl Bindable for NodeBinding<'_> {
    fn get_property(&self, name: &str) -> Option<PropertyValue> {
        get_from(&Self::properties(), self, name)
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), SceneError> {
        set_on(&Self::properties(), self, name, value)
    }
}
