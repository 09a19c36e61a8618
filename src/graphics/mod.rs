pub mod canvas;
pub mod color;
pub mod engine;
pub mod raster;
pub mod shader;
pub mod styles;
pub mod texture;
pub mod vertex;
pub mod visualizer;

pub use canvas::{Canvas, ColorStop, Paint, Path, Point, SubPath};
pub use color::{adjust_color, ColorFormat, Rgba};
pub use engine::GraphicsEngine;
pub use raster::RasterCanvas;
pub use shader::ShaderManager;
pub use texture::TextureManager;
pub use vertex::{Vertex, VertexBuffer};
pub use visualizer::{CanvasFade, FrequencySource, RenderMode, VisualStyle, Visualizer, VisualizerConfig};
