use std::num::NonZeroU64;
use std::sync::Arc;

use crate::cascade::{CascadeBackend, Pass, PassDescriptor, PassUniforms, Resolution};
use crate::device::{Gpu, GpuFrame, LostSignal};
use crate::error::{DeviceError, ResourceError};
use crate::scene::{SceneBuffer, RECORD_STRIDE};

/// Format of every march target: `[t, steps, tag, hit]` at full float precision.
pub const MARCH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// Scene storage is never smaller than this many records (zero-sized bindings are invalid).
const MIN_SCENE_RECORDS: usize = 16;

/// Off-screen march target of one pass.
#[derive(Debug)]
pub struct WgpuTarget {
    view: wgpu::TextureView,
    resolution: Resolution,
}

impl WgpuTarget {
    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }
}

/// Cached per-pass bindings; rebuilt when the input target or scene storage changes.
struct PassBinding {
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    input: Option<Arc<WgpuTarget>>,
    scene_epoch: u64,
}

struct SceneStorage {
    buffer: wgpu::Buffer,
    capacity_records: usize,
    /// Structural generation of the last uploaded scene.
    generation: Option<u64>,
    /// Bumped whenever `buffer` is replaced.
    epoch: u64,
}

/// wgpu implementation of the cascade backend.
///
/// Every pass is a fullscreen triangle recorded into the frame's encoder. Each
/// pass owns its uniform buffer so all passes keep distinct values within one
/// submission.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    lost: LostSignal,

    march_pipeline: wgpu::RenderPipeline,
    final_pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,

    placeholder_view: wgpu::TextureView,
    scene: SceneStorage,
    bindings: Vec<Option<PassBinding>>,
}

impl WgpuBackend {
    /// Builds pipelines for the GPU's current surface format.
    pub fn new(gpu: &Gpu<'_>) -> Self {
        Self::with_device(
            gpu.device(),
            gpu.queue(),
            gpu.surface_format(),
            gpu.lost_signal().clone(),
        )
    }

    pub fn with_device(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        lost: LostSignal,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("conemarch shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/conemarch.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("conemarch bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(
                            std::mem::size_of::<PassUniforms>() as u64
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("conemarch pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let march_target = Some(wgpu::ColorTargetState {
            format: MARCH_FORMAT,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        });
        let surface_target = Some(wgpu::ColorTargetState {
            format: surface_format,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        });

        let march_pipeline = create_pipeline(
            device,
            &pipeline_layout,
            &shader,
            "conemarch march pipeline",
            "fs_march",
            &[march_target.clone()],
        );
        let final_pipeline = create_pipeline(
            device,
            &pipeline_layout,
            &shader,
            "conemarch final pipeline",
            "fs_final",
            &[march_target, surface_target],
        );

        let placeholder = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("conemarch placeholder input"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: MARCH_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let placeholder_view = placeholder.create_view(&wgpu::TextureViewDescriptor::default());

        let scene = SceneStorage {
            buffer: create_scene_buffer(device, MIN_SCENE_RECORDS),
            capacity_records: MIN_SCENE_RECORDS,
            generation: None,
            epoch: 0,
        };

        Self {
            device: device.clone(),
            queue: queue.clone(),
            surface_format,
            lost,
            march_pipeline,
            final_pipeline,
            bind_group_layout,
            placeholder_view,
            scene,
            bindings: Vec::new(),
        }
    }

    #[inline]
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    // ── private helpers ────────────────────────────────────────────────────

    fn ensure_scene_capacity(&mut self, records: usize) {
        let Some(capacity) = grown_capacity(self.scene.capacity_records, records) else {
            return;
        };
        self.scene.buffer = create_scene_buffer(&self.device, capacity);
        self.scene.capacity_records = capacity;
        self.scene.epoch = self.scene.epoch.wrapping_add(1);
        log::debug!("scene storage grown to {capacity} records");
    }

    /// Rebuilds the bind group of `pass` if its input or the scene storage changed.
    fn ensure_binding(&mut self, pass: &Pass<WgpuTarget>) {
        let index = pass.descriptor().index;
        if self.bindings.len() <= index {
            self.bindings.resize_with(index + 1, || None);
        }

        let fresh = self.bindings[index].as_ref().is_some_and(|b| {
            b.scene_epoch == self.scene.epoch
                && match (&b.input, pass.input()) {
                    (Some(cached), Some(current)) => Arc::ptr_eq(cached, current),
                    (None, None) => true,
                    _ => false,
                }
        });

        if !fresh {
            let uniform_buffer = match self.bindings[index].take() {
                Some(old) => old.uniform_buffer,
                None => self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("conemarch pass ubo"),
                    size: std::mem::size_of::<PassUniforms>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                }),
            };

            let input_view = pass.input().map_or(&self.placeholder_view, |t| &t.view);
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("conemarch pass bind group"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(input_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: self.scene.buffer.as_entire_binding(),
                    },
                ],
            });

            self.bindings[index] = Some(PassBinding {
                uniform_buffer,
                bind_group,
                input: pass.input().cloned(),
                scene_epoch: self.scene.epoch,
            });
        }
    }
}

impl CascadeBackend for WgpuBackend {
    type Target = WgpuTarget;
    type Frame = GpuFrame;

    fn allocate_target(&mut self, pass: &PassDescriptor) -> Result<WgpuTarget, ResourceError> {
        let res = pass.resolution;
        let max = self.device.limits().max_texture_dimension_2d;
        if res.width == 0 || res.height == 0 || res.width > max || res.height > max {
            return Err(ResourceError::TargetAllocation {
                pass: pass.index,
                width: res.width,
                height: res.height,
                reason: format!("size outside device limits (1..={max})"),
            });
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("conemarch march target"),
            size: wgpu::Extent3d {
                width: res.width,
                height: res.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: MARCH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(WgpuTarget {
            view,
            resolution: res,
        })
    }

    fn prepare(&mut self, scene: &SceneBuffer) -> Result<(), DeviceError> {
        if self.lost.is_raised() {
            return Err(DeviceError::Lost);
        }

        self.ensure_scene_capacity(scene.primitive_count());
        if self.scene.generation != Some(scene.generation()) {
            log::debug!("scene uploaded: {} records", scene.primitive_count());
            self.scene.generation = Some(scene.generation());
        }
        if !scene.is_empty() {
            self.queue.write_buffer(&self.scene.buffer, 0, scene.as_bytes());
        }
        Ok(())
    }

    fn draw_pass(
        &mut self,
        frame: &mut GpuFrame,
        pass: &Pass<WgpuTarget>,
        uniforms: &PassUniforms,
    ) -> Result<(), DeviceError> {
        if self.lost.is_raised() {
            return Err(DeviceError::Lost);
        }

        let last = uniforms.is_last();
        if last && frame.resolution() != pass.descriptor().resolution {
            return Err(DeviceError::Outdated);
        }

        self.ensure_binding(pass);
        let index = pass.descriptor().index;
        let Some(binding) = self.bindings.get(index).and_then(Option::as_ref) else {
            return Err(DeviceError::Other(format!("no bindings for pass {index}")));
        };
        self.queue
            .write_buffer(&binding.uniform_buffer, 0, bytemuck::bytes_of(uniforms));

        let target = pass.target();
        let march_attachment = Some(wgpu::RenderPassColorAttachment {
            view: &target.view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        });

        let (pipeline, attachments, label) = if last {
            let [r, g, b, a] = uniforms.background;
            let surface_attachment = Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: r as f64,
                        g: g as f64,
                        b: b as f64,
                        a: a as f64,
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            });
            (
                &self.final_pipeline,
                vec![march_attachment, surface_attachment],
                "conemarch final pass",
            )
        } else {
            (
                &self.march_pipeline,
                vec![march_attachment],
                "conemarch march pass",
            )
        };

        let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &attachments,
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, &binding.bind_group, &[]);
        rpass.draw(0..3, 0..1);

        Ok(())
    }

    fn reset(&mut self) {
        self.bindings.clear();
        self.scene.generation = None;
    }
}

/// New storage capacity in records, or `None` when `records` already fit.
fn grown_capacity(capacity: usize, records: usize) -> Option<usize> {
    (records > capacity).then(|| records.next_power_of_two().max(MIN_SCENE_RECORDS))
}

fn create_scene_buffer(device: &wgpu::Device, records: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("conemarch scene storage"),
        size: (records * RECORD_STRIDE * std::mem::size_of::<f32>()) as u64,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    label: &str,
    fs_entry: &str,
    targets: &[Option<wgpu::ColorTargetState>],
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fs_entry),
            compilation_options: Default::default(),
            targets,
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse() -> naga::Module {
        naga::front::wgsl::parse_str(include_str!("shaders/conemarch.wgsl")).expect("wgsl parses")
    }

    #[test]
    fn scene_storage_grows_whenever_records_exceed_capacity() {
        assert_eq!(grown_capacity(16, 3), None);
        assert_eq!(grown_capacity(16, 16), None);
        assert_eq!(grown_capacity(16, 17), Some(32));
        assert_eq!(grown_capacity(0, 1), Some(MIN_SCENE_RECORDS));
        assert_eq!(grown_capacity(64, 100), Some(128));
    }

    #[test]
    fn shader_validates() {
        let module = parse();
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .expect("wgsl validates");
    }

    #[test]
    fn shader_has_every_entry_point() {
        let module = parse();
        let names: Vec<&str> = module.entry_points.iter().map(|e| e.name.as_str()).collect();
        for name in ["vs_main", "fs_march", "fs_final"] {
            assert!(names.contains(&name), "missing entry point {name}");
        }
    }

    #[test]
    fn shader_uniform_layout_matches_rust() {
        let module = parse();
        let (_, ty) = module
            .types
            .iter()
            .find(|(_, t)| t.name.as_deref() == Some("PassUniforms"))
            .expect("PassUniforms declared");

        let naga::TypeInner::Struct { members, span } = &ty.inner else {
            panic!("PassUniforms is not a struct");
        };
        assert_eq!(*span as usize, std::mem::size_of::<PassUniforms>());

        let offset = |name: &str| {
            members
                .iter()
                .find(|m| m.name.as_deref() == Some(name))
                .map(|m| m.offset)
                .expect("member")
        };
        assert_eq!(offset("camera_basis"), 0);
        assert_eq!(offset("background"), 64);
        assert_eq!(offset("resolution"), 80);
        assert_eq!(offset("time"), 88);
        assert_eq!(offset("half_fov_tan"), 96);
        assert_eq!(offset("max_steps"), 108);
        assert_eq!(offset("flags"), 116);
    }
}
