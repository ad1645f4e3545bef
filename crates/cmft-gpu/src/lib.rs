//! `wgpu` adapter for `cmft_core::scheduler::GpuBackend` (spec.md §9
//! "OpenCL coupling" and §4.4 "GPU task execution").
//!
//! The source is written against a thin OpenCL-shaped surface: platforms,
//! devices, a context, one compiled kernel, 2-D images. This crate
//! reproduces that shape against `wgpu` instead — one device/queue pair,
//! one compute pipeline compiled from `shaders/radiance_filter.wgsl`,
//! storage buffers standing in for the OpenCL images — behind the same
//! `GpuBackend` trait seam, so a CUDA or native compute-shader adapter
//! could be dropped in without touching `cmft-core`.

use bytemuck_derive::{Pod, Zeroable};
use cmft_core::error::{CmftError, Result};
use cmft_core::filter::{determine_filter_area, FaceData, RadianceTask};
use cmft_core::scheduler::{GpuBackend, MipParams};
use thiserror::Error;
use wgpu::util::DeviceExt;

/// The 64x64 tile size the source's kernel launches process at a time
/// (spec.md §4.4); the unit of GPU dispatch, never crossing a face
/// boundary.
pub const GPU_TILE: u32 = 64;

#[derive(Debug, Error)]
pub enum GpuAdapterError {
    #[error("no suitable wgpu adapter available")]
    NoAdapter,
    #[error("failed to request wgpu device: {0}")]
    DeviceRequest(String),
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct GpuTask {
    tap_dir: [f32; 4],
    areas: [[f32; 4]; 6],
    specular_power: f32,
    cos_cutoff: f32,
    dst_x: u32,
    dst_y: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct GpuParams {
    src_face_size: u32,
    dst_face_size: u32,
    _pad: [u32; 2],
}

/// Device-side mirror of the source cubemap, uploaded once per filter
/// call and reused across every task (spec.md §5 "GPU context").
pub struct WgpuRadianceBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    src_face_size: u32,
    src_rgba_buf: Option<wgpu::Buffer>,
    src_normals_buf: Option<wgpu::Buffer>,
}

impl WgpuRadianceBackend {
    /// Creates a device/queue and compiles the radiance-filter kernel.
    /// Returns [`CmftError::DeviceUnavailable`] if no adapter or device is
    /// available, matching the source's non-fatal GPU-unavailable path.
    pub fn new() -> Result<Self> {
        pollster::block_on(Self::new_async())
    }

    async fn new_async() -> Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                ..Default::default()
            })
            .await
            .map_err(|_| CmftError::DeviceUnavailable(GpuAdapterError::NoAdapter.to_string()))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("cmft-gpu device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            })
            .await
            .map_err(|e| {
                CmftError::DeviceUnavailable(GpuAdapterError::DeviceRequest(e.to_string()).to_string())
            })?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("radiance_filter"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/radiance_filter.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("radiance_filter bind group layout"),
            entries: &[
                storage_entry(0, true),
                storage_entry(1, true),
                storage_entry(2, true),
                storage_entry(3, false),
                uniform_entry(4),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("radiance_filter pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("radiance_filter pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("radiance_filter_single_face"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        Ok(WgpuRadianceBackend {
            device,
            queue,
            pipeline,
            bind_group_layout,
            src_face_size: 0,
            src_rgba_buf: None,
            src_normals_buf: None,
        })
    }

    fn build_tasks(&self, tasks: &[RadianceTask], params: MipParams) -> Vec<GpuTask> {
        tasks
            .iter()
            .map(|t| {
                let areas = determine_filter_area(t.tap_dir, params.filter_size);
                let mut packed = [[1.0f32, 1.0, 0.0, 0.0]; 6];
                for (i, a) in areas.iter().enumerate() {
                    packed[i] = if a.is_empty() {
                        [1.0, 1.0, 0.0, 0.0] // min > max marks an empty box
                    } else {
                        [a.min()[0], a.min()[1], a.max()[0], a.max()[1]]
                    };
                }
                GpuTask {
                    tap_dir: [t.tap_dir[0], t.tap_dir[1], t.tap_dir[2], 0.0],
                    areas: packed,
                    specular_power: params.specular_power,
                    cos_cutoff: params.specular_angle.cos(),
                    dst_x: t.x,
                    dst_y: t.y,
                }
            })
            .collect()
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

impl GpuBackend for WgpuRadianceBackend {
    fn upload_source(&mut self, faces: &[FaceData; 6]) -> Result<()> {
        let size = faces[0].size;
        let face_texels = (size * size) as usize;

        let mut rgba = Vec::with_capacity(face_texels * 6 * 4);
        let mut normals = Vec::with_capacity(face_texels * 6 * 4);
        for face in faces {
            rgba.extend_from_slice(face.rgba);
            for n in face.normals {
                normals.extend_from_slice(n);
            }
        }

        self.src_rgba_buf = Some(self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("cmft src rgba"),
            contents: bytemuck::cast_slice(&rgba),
            usage: wgpu::BufferUsages::STORAGE,
        }));
        self.src_normals_buf = Some(self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("cmft src normals"),
            contents: bytemuck::cast_slice(&normals),
            usage: wgpu::BufferUsages::STORAGE,
        }));
        self.src_face_size = size;

        Ok(())
    }

    fn run_face(&mut self, tasks: &[RadianceTask], params: MipParams) -> Result<Vec<[f32; 3]>> {
        let src_rgba_buf = self
            .src_rgba_buf
            .as_ref()
            .ok_or_else(|| CmftError::DeviceFailed("source not uploaded".into()))?;
        let src_normals_buf = self
            .src_normals_buf
            .as_ref()
            .ok_or_else(|| CmftError::DeviceFailed("normals not uploaded".into()))?;

        let dst_face_size = ((tasks.len() as f64).sqrt().round()) as u32;
        let gpu_tasks = self.build_tasks(tasks, params);

        let task_buf = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("cmft tasks"),
            contents: bytemuck::cast_slice(&gpu_tasks),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let dst_buf_size = (tasks.len() * std::mem::size_of::<[f32; 4]>()) as u64;
        let dst_buf = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cmft dst rgba"),
            size: dst_buf_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let gpu_params = GpuParams {
            src_face_size: self.src_face_size,
            dst_face_size,
            _pad: [0; 2],
        };
        let params_buf = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("cmft params"),
            contents: bytemuck::bytes_of(&gpu_params),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("cmft radiance filter bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: task_buf.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: src_rgba_buf.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 2, resource: src_normals_buf.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 3, resource: dst_buf.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 4, resource: params_buf.as_entire_binding() },
            ],
        });

        let readback_buf = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cmft dst readback"),
            size: dst_buf_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("cmft radiance filter encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("cmft radiance filter pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            let tiles = tasks.len().div_ceil((GPU_TILE * GPU_TILE) as usize).max(1) as u32;
            pass.dispatch_workgroups(GPU_TILE / 8, (GPU_TILE / 8) * tiles, 1);
        }
        encoder.copy_buffer_to_buffer(&dst_buf, 0, &readback_buf, 0, dst_buf_size);
        self.queue.submit(Some(encoder.finish()));

        let slice = readback_buf.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| CmftError::DeviceFailed(e.to_string()))?
            .map_err(|e| CmftError::DeviceFailed(e.to_string()))?;

        let data = slice.get_mapped_range();
        let floats: &[f32] = bytemuck::cast_slice(&data);
        let colors = floats
            .chunks_exact(4)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        drop(data);
        readback_buf.unmap();

        Ok(colors)
    }
}
