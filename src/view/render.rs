use std::ops::Range;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use wgpu::*;

use super::gpu_init::GpuContext;
use super::mesh::{self, MeshBuffer, Vertex};
use crate::config::TreeKind;
use crate::model::{DrawMode, VoxelInstance};
use crate::scene::{RenderBackend, SkyboxPass, TerrainPass, TreeInstance};

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

const CLEAR_COLOR: Color = Color { r: 0.5, g: 0.8, b: 1.0, a: 1.0 };

static MESH_ATTRIBUTES: [VertexAttribute; 3] = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x4];
// terrain and sky only read position and normal
static SHAPE_ATTRIBUTES: [VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
static VOXEL_ATTRIBUTES: [VertexAttribute; 2] = wgpu::vertex_attr_array![2 => Float32x3, 3 => Float32x4];
static TREE_ATTRIBUTES: [VertexAttribute; 7] = wgpu::vertex_attr_array![
    3 => Float32x4, 4 => Float32x4, 5 => Float32x4, 6 => Float32x4, // model
    7 => Float32x3, 8 => Float32x3, 9 => Float32x3                   // normal matrix
];

/// Shared by the terrain and tree shaders
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SceneUniform {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub light_view: [[f32; 4]; 4],
    pub colour_mode: u32,
    _pad: [u32; 3],
}

impl From<&TerrainPass> for SceneUniform {
    fn from(pass: &TerrainPass) -> Self {
        Self {
            view: pass.view.to_cols_array_2d(),
            projection: pass.projection.to_cols_array_2d(),
            light_view: pass.light_view.to_cols_array_2d(),
            colour_mode: pass.colour_mode.as_uniform(),
            _pad: [0; 3],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SkyUniform {
    pub view_proj_model: [[f32; 4]; 4],
    pub colour_mode: u32,
    _pad: [u32; 3],
}

impl From<&SkyboxPass> for SkyUniform {
    fn from(pass: &SkyboxPass) -> Self {
        Self {
            view_proj_model: (pass.projection * pass.view * pass.model).to_cols_array_2d(),
            colour_mode: pass.colour_mode.as_uniform(),
            _pad: [0; 3],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TreeInstanceRaw {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 3]; 3],
}

impl From<&TreeInstance> for TreeInstanceRaw {
    fn from(tree: &TreeInstance) -> Self {
        Self {
            model: tree.model.to_cols_array_2d(),
            normal: tree.normal.to_cols_array_2d(),
        }
    }
}

/// Everything recorded through `RenderBackend` for one frame, before upload.
/// Chunks share one instance buffer; each keeps its own range so it still gets its own draw call.
#[derive(Debug, Default)]
pub struct DrawList {
    pub sky: Option<SkyUniform>,
    pub terrain: Option<(SceneUniform, DrawMode)>,
    pub voxels: Vec<VoxelInstance>,
    pub chunk_ranges: Vec<Range<u32>>,
    pub pines: Vec<TreeInstanceRaw>,
    pub broadleaves: Vec<TreeInstanceRaw>,
}

impl DrawList {
    pub fn clear(&mut self) {
        self.sky = None;
        self.terrain = None;
        self.voxels.clear();
        self.chunk_ranges.clear();
        self.pines.clear();
        self.broadleaves.clear();
    }

    pub fn trees(&self, kind: TreeKind) -> &[TreeInstanceRaw] {
        match kind {
            TreeKind::Pine => &self.pines,
            TreeKind::Broadleaf => &self.broadleaves,
        }
    }
}

impl RenderBackend for DrawList {
    fn draw_skybox(&mut self, pass: &SkyboxPass) {
        self.sky = Some(pass.into());
    }

    fn begin_terrain(&mut self, pass: &TerrainPass) {
        self.terrain = Some((pass.into(), pass.draw_mode));
    }

    fn draw_chunk(&mut self, instances: &[VoxelInstance]) {
        let start = self.voxels.len() as u32;
        self.voxels.extend_from_slice(instances);
        self.chunk_ranges.push(start..self.voxels.len() as u32);
    }

    fn draw_tree(&mut self, tree: &TreeInstance) {
        let raw = TreeInstanceRaw::from(tree);
        match tree.kind {
            TreeKind::Pine => self.pines.push(raw),
            TreeKind::Broadleaf => self.broadleaves.push(raw),
        }
    }
}

/// Fill pipeline plus the line/point variants the device supports
struct PolygonPipelines {
    fill: RenderPipeline,
    line: Option<RenderPipeline>,
    point: Option<RenderPipeline>,
}

impl PolygonPipelines {
    fn select(&self, mode: DrawMode) -> &RenderPipeline {
        let variant = match mode {
            DrawMode::Fill => None,
            DrawMode::Lines => self.line.as_ref(),
            DrawMode::Points => self.point.as_ref(),
        };
        variant.unwrap_or(&self.fill)
    }
}

struct PipelineSpec<'a> {
    label: &'a str,
    shader: &'a ShaderModule,
    layout: &'a PipelineLayout,
    buffers: &'a [VertexBufferLayout<'a>],
    format: TextureFormat,
    cull_mode: Option<Face>,
    depth_write: bool,
    depth_compare: CompareFunction,
}

fn create_pipeline(device: &Device, spec: &PipelineSpec, polygon_mode: PolygonMode) -> RenderPipeline {
    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(spec.label),
        layout: Some(spec.layout),
        vertex: VertexState {
            module: spec.shader,
            entry_point: Some("vs_main"),
            buffers: spec.buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(FragmentState {
            module: spec.shader,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState {
                format: spec.format,
                blend: Some(BlendState::ALPHA_BLENDING),
                write_mask: ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: PrimitiveState {
            topology: PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: FrontFace::Ccw,
            cull_mode: spec.cull_mode,
            polygon_mode,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: spec.depth_write,
            depth_compare: spec.depth_compare,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
        multiview: None,
        cache: None,
    })
}

fn create_polygon_pipelines(device: &Device, spec: &PipelineSpec) -> PolygonPipelines {
    let features = device.features();
    PolygonPipelines {
        fill: create_pipeline(device, spec, PolygonMode::Fill),
        line: features
            .contains(Features::POLYGON_MODE_LINE)
            .then(|| create_pipeline(device, spec, PolygonMode::Line)),
        point: features
            .contains(Features::POLYGON_MODE_POINT)
            .then(|| create_pipeline(device, spec, PolygonMode::Point)),
    }
}

fn uniform_binding(
    device: &Device,
    label: &str,
    size: u64,
    visibility: ShaderStages,
) -> (Buffer, BindGroupLayout, BindGroup) {
    let buffer = device.create_buffer(&BufferDescriptor {
        label: Some(label),
        size,
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    });
    let bind_group = device.create_bind_group(&BindGroupDescriptor {
        label: Some(label),
        layout: &layout,
        entries: &[BindGroupEntry { binding: 0, resource: buffer.as_entire_binding() }],
    });
    (buffer, layout, bind_group)
}

pub fn create_depth_texture(device: &Device, width: u32, height: u32) -> (Texture, TextureView) {
    let depth_texture = device.create_texture(&TextureDescriptor {
        label: Some("depth_texture"),
        size: Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_view = depth_texture.create_view(&TextureViewDescriptor::default());
    (depth_texture, depth_view)
}

/// Vertex buffer that is reallocated (to the next power of two) when a frame outgrows it
struct InstanceBuffer {
    label: &'static str,
    buffer: Buffer,
    capacity: u64,
}

impl InstanceBuffer {
    fn new(device: &Device, label: &'static str, capacity: u64) -> Self {
        Self { label, buffer: Self::allocate(device, label, capacity), capacity }
    }

    fn allocate(device: &Device, label: &str, size: u64) -> Buffer {
        device.create_buffer(&BufferDescriptor {
            label: Some(label),
            size,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn write(&mut self, device: &Device, queue: &Queue, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let needed = bytes.len() as u64;
        if needed > self.capacity {
            self.capacity = needed.next_power_of_two();
            self.buffer = Self::allocate(device, self.label, self.capacity);
            tracing::debug!("grew {} to {} bytes", self.label, self.capacity);
        }
        queue.write_buffer(&self.buffer, 0, bytes);
    }
}

/// Output of one egui pass, handed over by the HUD
pub struct EguiFrame {
    pub primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

/// `RenderBackend` on wgpu: records through a `DrawList`, then uploads
/// and submits everything in `render_frame` as one command buffer.
pub struct WgpuBackend {
    device: Arc<Device>,
    queue: Arc<Queue>,

    scene_buffer: Buffer,
    scene_bind_group: BindGroup,
    sky_buffer: Buffer,
    sky_bind_group: BindGroup,

    terrain_pipelines: PolygonPipelines,
    tree_pipelines: PolygonPipelines,
    sky_pipeline: RenderPipeline,

    cube: MeshBuffer,
    sky_cube: MeshBuffer,
    pine: MeshBuffer,
    broadleaf: MeshBuffer,

    voxel_buffer: InstanceBuffer,
    pine_buffer: InstanceBuffer,
    broadleaf_buffer: InstanceBuffer,

    _depth_texture: Texture,
    depth_view: TextureView,

    egui_renderer: egui_wgpu::Renderer,
    list: DrawList,
}

impl WgpuBackend {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = gpu.device.clone();
        let queue = gpu.queue.clone();
        let (width, height) = gpu.size();

        let (scene_buffer, scene_layout, scene_bind_group) = uniform_binding(
            &device,
            "scene_uniform",
            std::mem::size_of::<SceneUniform>() as u64,
            ShaderStages::VERTEX | ShaderStages::FRAGMENT,
        );
        let (sky_buffer, sky_layout, sky_bind_group) = uniform_binding(
            &device,
            "sky_uniform",
            std::mem::size_of::<SkyUniform>() as u64,
            ShaderStages::VERTEX | ShaderStages::FRAGMENT,
        );

        let scene_pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("scene_pipeline_layout"),
            bind_group_layouts: &[&scene_layout],
            push_constant_ranges: &[],
        });
        let sky_pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("sky_pipeline_layout"),
            bind_group_layouts: &[&sky_layout],
            push_constant_ranges: &[],
        });

        let terrain_shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("terrain_shader"),
            source: ShaderSource::Wgsl(include_str!("shaders/terrain.wgsl").into()),
        });
        let tree_shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("tree_shader"),
            source: ShaderSource::Wgsl(include_str!("shaders/tree.wgsl").into()),
        });
        let sky_shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("sky_shader"),
            source: ShaderSource::Wgsl(include_str!("shaders/sky.wgsl").into()),
        });

        let mesh_layout = VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as BufferAddress,
            step_mode: VertexStepMode::Vertex,
            attributes: &MESH_ATTRIBUTES,
        };
        let shape_layout = VertexBufferLayout { attributes: &SHAPE_ATTRIBUTES, ..mesh_layout.clone() };

        let terrain_pipelines = create_polygon_pipelines(
            &device,
            &PipelineSpec {
                label: "terrain_pipeline",
                shader: &terrain_shader,
                layout: &scene_pipeline_layout,
                buffers: &[
                    shape_layout.clone(),
                    VertexBufferLayout {
                        array_stride: std::mem::size_of::<VoxelInstance>() as BufferAddress,
                        step_mode: VertexStepMode::Instance,
                        attributes: &VOXEL_ATTRIBUTES,
                    },
                ],
                format: gpu.format,
                cull_mode: Some(Face::Back),
                depth_write: true,
                depth_compare: CompareFunction::Less,
            },
        );

        let tree_pipelines = create_polygon_pipelines(
            &device,
            &PipelineSpec {
                label: "tree_pipeline",
                shader: &tree_shader,
                layout: &scene_pipeline_layout,
                buffers: &[
                    mesh_layout,
                    VertexBufferLayout {
                        array_stride: std::mem::size_of::<TreeInstanceRaw>() as BufferAddress,
                        step_mode: VertexStepMode::Instance,
                        attributes: &TREE_ATTRIBUTES,
                    },
                ],
                format: gpu.format,
                cull_mode: Some(Face::Back),
                depth_write: true,
                depth_compare: CompareFunction::Less,
            },
        );

        let sky_pipeline = create_pipeline(
            &device,
            &PipelineSpec {
                label: "sky_pipeline",
                shader: &sky_shader,
                layout: &sky_pipeline_layout,
                buffers: &[shape_layout],
                format: gpu.format,
                // seen from inside
                cull_mode: None,
                depth_write: false,
                depth_compare: CompareFunction::LessEqual,
            },
            PolygonMode::Fill,
        );

        if terrain_pipelines.line.is_none() || terrain_pipelines.point.is_none() {
            tracing::warn!("adapter lacks line/point polygon modes, those draw modes render filled");
        }

        let (depth_texture, depth_view) = create_depth_texture(&device, width, height);
        let egui_renderer = egui_wgpu::Renderer::new(&device, gpu.format, egui_wgpu::RendererOptions::default());

        let voxel_stride = std::mem::size_of::<VoxelInstance>() as u64;
        let tree_stride = std::mem::size_of::<TreeInstanceRaw>() as u64;

        Self {
            cube: mesh::unit_cube().upload(&device, "voxel_cube"),
            sky_cube: mesh::sky_cube().upload(&device, "sky_cube"),
            pine: mesh::tree(TreeKind::Pine).upload(&device, "pine"),
            broadleaf: mesh::tree(TreeKind::Broadleaf).upload(&device, "broadleaf"),
            voxel_buffer: InstanceBuffer::new(&device, "voxel_instances", voxel_stride * 9 * 256),
            pine_buffer: InstanceBuffer::new(&device, "pine_instances", tree_stride * 16),
            broadleaf_buffer: InstanceBuffer::new(&device, "broadleaf_instances", tree_stride * 16),
            scene_buffer,
            scene_bind_group,
            sky_buffer,
            sky_bind_group,
            terrain_pipelines,
            tree_pipelines,
            sky_pipeline,
            _depth_texture: depth_texture,
            depth_view,
            egui_renderer,
            list: DrawList::default(),
            device,
            queue,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        let (texture, view) = create_depth_texture(&self.device, width, height);
        self._depth_texture = texture;
        self.depth_view = view;
    }

    /// Whether `mode` has its own pipeline instead of falling back to fill
    pub fn supports(&self, mode: DrawMode) -> bool {
        match mode {
            DrawMode::Fill => true,
            DrawMode::Lines => self.terrain_pipelines.line.is_some(),
            DrawMode::Points => self.terrain_pipelines.point.is_some(),
        }
    }

    /// Submit everything recorded since the last call, plus the HUD.
    /// The recorded frame is dropped whether or not the surface could be acquired.
    pub fn render_frame(&mut self, gpu: &GpuContext, egui: Option<EguiFrame>) -> Result<(), SurfaceError> {
        let result = self.submit(gpu, egui);
        self.list.clear();
        result
    }

    fn upload(&mut self) {
        let (device, queue) = (&self.device, &self.queue);
        if let Some(sky) = &self.list.sky {
            queue.write_buffer(&self.sky_buffer, 0, bytemuck::bytes_of(sky));
        }
        if let Some((scene, _)) = &self.list.terrain {
            queue.write_buffer(&self.scene_buffer, 0, bytemuck::bytes_of(scene));
        }
        self.voxel_buffer.write(device, queue, bytemuck::cast_slice(&self.list.voxels));
        self.pine_buffer.write(device, queue, bytemuck::cast_slice(&self.list.pines));
        self.broadleaf_buffer.write(device, queue, bytemuck::cast_slice(&self.list.broadleaves));
    }

    fn submit(&mut self, gpu: &GpuContext, egui: Option<EguiFrame>) -> Result<(), SurfaceError> {
        let frame = gpu.surface.get_current_texture()?;
        self.upload();

        let view = frame.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&CommandEncoderDescriptor { label: Some("encoder") });

        {
            let mut rp = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("world_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations { load: LoadOp::Clear(CLEAR_COLOR), store: StoreOp::Store },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations { load: LoadOp::Clear(1.0), store: StoreOp::Store }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if self.list.sky.is_some() {
                rp.set_pipeline(&self.sky_pipeline);
                rp.set_bind_group(0, &self.sky_bind_group, &[]);
                rp.set_vertex_buffer(0, self.sky_cube.vertex_buffer.slice(..));
                rp.set_index_buffer(self.sky_cube.index_buffer.slice(..), IndexFormat::Uint32);
                rp.draw_indexed(0..self.sky_cube.index_count, 0, 0..1);
            }

            if let Some((_, draw_mode)) = self.list.terrain {
                rp.set_bind_group(0, &self.scene_bind_group, &[]);

                // DRAW CHUNKS
                if !self.list.voxels.is_empty() {
                    rp.set_pipeline(self.terrain_pipelines.select(draw_mode));
                    rp.set_vertex_buffer(0, self.cube.vertex_buffer.slice(..));
                    rp.set_vertex_buffer(1, self.voxel_buffer.buffer.slice(..));
                    rp.set_index_buffer(self.cube.index_buffer.slice(..), IndexFormat::Uint32);
                    for range in self.list.chunk_ranges.iter().filter(|r| !r.is_empty()) {
                        rp.draw_indexed(0..self.cube.index_count, 0, range.clone());
                    }
                }

                // DRAW TREES
                rp.set_pipeline(self.tree_pipelines.select(draw_mode));
                for (mesh, buffer, count) in [
                    (&self.pine, &self.pine_buffer, self.list.pines.len()),
                    (&self.broadleaf, &self.broadleaf_buffer, self.list.broadleaves.len()),
                ] {
                    if count == 0 {
                        continue;
                    }
                    rp.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                    rp.set_vertex_buffer(1, buffer.buffer.slice(..));
                    rp.set_index_buffer(mesh.index_buffer.slice(..), IndexFormat::Uint32);
                    rp.draw_indexed(0..mesh.index_count, 0, 0..count as u32);
                }
            }
        }

        let mut command_buffers = Vec::new();
        if let Some(egui) = egui {
            let screen_descriptor = egui_wgpu::ScreenDescriptor {
                size_in_pixels: [gpu.config.width, gpu.config.height],
                pixels_per_point: egui.pixels_per_point,
            };

            for (id, image_delta) in &egui.textures_delta.set {
                self.egui_renderer.update_texture(&self.device, &self.queue, *id, image_delta);
            }
            command_buffers = self.egui_renderer.update_buffers(
                &self.device,
                &self.queue,
                &mut encoder,
                &egui.primitives,
                &screen_descriptor,
            );

            {
                let egui_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                    label: Some("egui_render_pass"),
                    color_attachments: &[Some(RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: Operations { load: LoadOp::Load, store: StoreOp::Store },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                self.egui_renderer
                    .render(&mut egui_pass.forget_lifetime(), &egui.primitives, &screen_descriptor);
            }

            for id in &egui.textures_delta.free {
                self.egui_renderer.free_texture(id);
            }
        }

        command_buffers.push(encoder.finish());
        self.queue.submit(command_buffers);
        frame.present();
        tracing::trace!(
            "submitted {} chunks, {} voxels, {} trees",
            self.list.chunk_ranges.len(),
            self.list.voxels.len(),
            self.list.pines.len() + self.list.broadleaves.len()
        );
        Ok(())
    }
}

impl RenderBackend for WgpuBackend {
    fn draw_skybox(&mut self, pass: &SkyboxPass) {
        self.list.draw_skybox(pass);
    }

    fn begin_terrain(&mut self, pass: &TerrainPass) {
        self.list.begin_terrain(pass);
    }

    fn draw_chunk(&mut self, instances: &[VoxelInstance]) {
        self.list.draw_chunk(instances);
    }

    fn draw_tree(&mut self, tree: &TreeInstance) {
        self.list.draw_tree(tree);
    }
}
