//! `dragcare-render` – the rendering collaborator seam.
//!
//! The tracking engine never touches meshes or materials.  It describes what
//! it wants with an [`EntitySpec`][dragcare_types::EntitySpec] and hands it to
//! a [`Renderer`], which owns the actual scene graph.
//!
//! # Modules
//!
//! - [`renderer`] – [`Renderer`][renderer::Renderer]: the trait a scene
//!   backend implements, plus the owned [`Entity`][renderer::Entity] value and
//!   [`RenderError`][renderer::RenderError].
//! - [`assets`] – [`AssetLibrary`][assets::AssetLibrary]: catalog of named
//!   model assets that can be loaded into the scene.
//! - [`sim`] – [`SimRenderer`][sim::SimRenderer]: an in-process renderer that
//!   records every scene command, for tests, CI and scenario replay.

pub mod assets;
pub mod renderer;
pub mod sim;

pub use assets::AssetLibrary;
pub use renderer::{Entity, EntityId, RenderError, Renderer};
pub use sim::{SceneCommand, SimRenderer};
