use anyhow::Result;
use std::collections::HashMap;
use wgpu::{Device, RenderPipeline, ShaderModule};

use super::Vertex;

/// Compiled WGSL modules and the pipelines built from them, both by name.
pub struct ShaderManager {
    modules: HashMap<String, ShaderModule>,
    pipelines: HashMap<String, RenderPipeline>,
}

impl ShaderManager {
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
            pipelines: HashMap::new(),
        }
    }

    /// Compiles `source` and stores it as `name`, replacing any earlier
    /// module of that name.
    pub fn load_shader(&mut self, device: &Device, name: &str, source: &str) -> Result<()> {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(name),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        self.modules.insert(name.to_string(), module);
        Ok(())
    }

    /// Builds the pipeline `name` from module `module_name`.
    ///
    /// The module must export `vs_main` taking [`Vertex`] and `fs_main`
    /// writing one color target. `bind_group_layouts` are bound in order, so
    /// index `i` here is `@group(i)` in the shader. Output is alpha-blended
    /// onto the target so a canvas with straight alpha composites over the
    /// clear color.
    pub fn create_pipeline(
        &mut self,
        device: &Device,
        name: &str,
        module_name: &str,
        format: wgpu::TextureFormat,
        bind_group_layouts: &[&wgpu::BindGroupLayout],
    ) -> Result<()> {
        let module = self
            .modules
            .get(module_name)
            .ok_or_else(|| anyhow::anyhow!("No shader module named '{}'", module_name))?;

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} layout", name)),
            bind_group_layouts,
            push_constant_ranges: &[],
        });

        let target = wgpu::ColorTargetState {
            format,
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            write_mask: wgpu::ColorWrites::ALL,
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(name),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: "vs_main",
                buffers: &[Vertex::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: "fs_main",
                targets: &[Some(target)],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            // A fullscreen quad: triangle list, both windings drawn.
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        self.pipelines.insert(name.to_string(), pipeline);
        Ok(())
    }

    pub fn get_pipeline(&self, name: &str) -> Option<&RenderPipeline> {
        self.pipelines.get(name)
    }
}
