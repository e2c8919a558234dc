// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! `ComputeBackend` on top of wgpu.
//!
//! The cloud lives in one buffer usable both as a storage buffer by the
//! compute shader and as a vertex buffer by a renderer.  Uniforms are
//! shadowed on the host and written to the device just before the
//! dispatch that needs them.
//!
//! wgpu has no explicit memory barrier.  Each dispatch is recorded into
//! its own compute pass; `memory_barrier` submits everything recorded
//! so far, and wgpu orders the storage-buffer hazard between passes and
//! submissions.  A uniform change with dispatches still unsubmitted
//! submits them first, so each dispatch sees the uniforms set before it.

use std::mem;
use std::sync::mpsc;

use bytemuck::{Pod, Zeroable};

use super::{
    Barrier, ComputeBackend, UniformLocation, MAP_COUNT_UNIFORM, MAX_MAPS, SEED_UNIFORM,
    TRANSFORMS_UNIFORM,
};
use crate::error::{Error, Result};
use crate::points::Point;
use crate::transforms::{Mat4, IDENTITY};

const WORKGROUP_SIZE: u32 = 64;
const MAX_GROUPS_PER_DIMENSION: u32 = 65_535;

const TRANSFORMS_OFFSET: u32 = 0;
const MAP_COUNT_OFFSET: u32 = (MAX_MAPS * mem::size_of::<Mat4>()) as u32;
const SEED_OFFSET: u32 = MAP_COUNT_OFFSET + 4;

/// Host mirror of the shader's `Uniforms` block.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Uniforms {
    transformations: [Mat4; MAX_MAPS],
    map_count: u32,
    seed: u32,
    point_count: u32,
    _pad: u32,
}

/// A wgpu device running the chaos-game compute shader.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    points: Option<(wgpu::Buffer, wgpu::BindGroup)>,
    uniforms: Uniforms,
    uniforms_dirty: bool,
    recorded: Vec<wgpu::CommandBuffer>,
}

impl WgpuBackend {
    /// Pick the highest-performance adapter and build the pipeline.
    pub fn new() -> Result<Self> {
        pollster::block_on(WgpuBackend::init_async())
    }

    async fn init_async() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| Error::GpuInit("no compatible adapter".to_string()))?;
        let info = adapter.get_info();
        info!(
            "compute adapter: {} ({:?}, {:?})",
            info.name, info.backend, info.device_type
        );

        let (device, queue): (wgpu::Device, wgpu::Queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("ifscloud"),
                    required_features: wgpu::Features::empty(),
                    // Caps a cloud at 128 MiB; `upload_points` enforces it.
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(|e| Error::GpuInit(e.to_string()))?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("chaos game"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/chaos.wgsl").into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("chaos game layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("chaos game pipeline layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("chaos game"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "main",
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        let uniforms = Uniforms {
            transformations: [IDENTITY; MAX_MAPS],
            map_count: 1,
            seed: 0,
            point_count: 0,
            _pad: 0,
        };
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("chaos game uniforms"),
            size: mem::size_of::<Uniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(WgpuBackend {
            device,
            queue,
            pipeline,
            layout,
            uniform_buffer,
            points: None,
            uniforms,
            uniforms_dirty: true,
            recorded: vec![],
        })
    }

    /// The largest cloud the device can bind as one storage buffer.
    pub fn max_points(&self) -> usize {
        let limits = self.device.limits();
        let bytes = u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size);
        (bytes / mem::size_of::<Point>() as u64) as usize
    }

    /// Block until everything submitted so far has run.
    pub fn finish(&mut self) {
        self.submit();
        self.device.poll(wgpu::Maintain::Wait);
    }

    /// The device copy of the cloud, for binding as a vertex buffer.
    pub fn points_buffer(&self) -> Option<&wgpu::Buffer> {
        self.points.as_ref().map(|(buffer, _)| buffer)
    }

    /// Copy the device cloud back to the host.  A diagnostic for
    /// snapshots and tests; the engine's host copy is not touched.
    pub fn read_points(&mut self) -> Result<Vec<Point>> {
        self.submit();
        let source = match self.points {
            Some((ref buffer, _)) => buffer,
            None => return Ok(vec![]),
        };
        let size = source.size();
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("chaos game readback"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("readback") });
        encoder.copy_buffer_to_buffer(source, 0, &staging, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| Error::Gpu(e.to_string()))?
            .map_err(|e| Error::Gpu(e.to_string()))?;

        let points = {
            let mapped = slice.get_mapped_range();
            bytemuck::cast_slice::<u8, Point>(&mapped[..]).to_vec()
        };
        staging.unmap();
        Ok(points)
    }

    fn submit(&mut self) {
        if !self.recorded.is_empty() {
            self.queue.submit(self.recorded.drain(..));
        }
    }

    fn write_uniform_bytes(&mut self, offset: u32, bytes: &[u8]) -> Result<()> {
        let start = offset as usize;
        let end = start + bytes.len();
        let block = bytemuck::bytes_of_mut(&mut self.uniforms);
        if end > block.len() {
            return Err(Error::Gpu(format!(
                "uniform write of {} bytes at {} overruns the {}-byte block",
                bytes.len(),
                start,
                block.len()
            )));
        }
        block[start..end].copy_from_slice(bytes);
        self.uniforms_dirty = true;
        Ok(())
    }

    fn flush_uniforms(&mut self) {
        if self.uniforms_dirty {
            self.submit();
            self.queue
                .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));
            self.uniforms_dirty = false;
        }
    }
}

impl ComputeBackend for WgpuBackend {
    fn upload_points(&mut self, points: &[Point]) -> Result<()> {
        if points.is_empty() {
            return Err(Error::Gpu("cannot upload an empty cloud".to_string()));
        }
        if points.len() > self.max_points() {
            return Err(Error::Gpu(format!(
                "{} points exceed the device's storage binding limit of {} points",
                points.len(),
                self.max_points()
            )));
        }
        self.submit();
        let bytes: &[u8] = bytemuck::cast_slice(points);
        let reuse = match self.points {
            Some((ref buffer, _)) => buffer.size() == bytes.len() as u64,
            None => false,
        };
        if reuse {
            if let Some((ref buffer, _)) = self.points {
                self.queue.write_buffer(buffer, 0, bytes);
            }
        } else {
            use wgpu::util::DeviceExt;
            self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
            self.device.push_error_scope(wgpu::ErrorFilter::Validation);
            let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("chaos game points"),
                contents: bytes,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::VERTEX
                    | wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::COPY_SRC,
            });
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("chaos game bindings"),
                layout: &self.layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: self.uniform_buffer.as_entire_binding(),
                    },
                ],
            });
            let validation = pollster::block_on(self.device.pop_error_scope());
            let memory = pollster::block_on(self.device.pop_error_scope());
            if let Some(e) = validation.or(memory) {
                self.points = None;
                return Err(Error::Gpu(e.to_string()));
            }
            self.points = Some((buffer, bind_group));
        }
        self.uniforms.point_count = points.len() as u32;
        self.uniforms_dirty = true;
        Ok(())
    }

    fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        match name {
            TRANSFORMS_UNIFORM => Some(UniformLocation(TRANSFORMS_OFFSET)),
            MAP_COUNT_UNIFORM => Some(UniformLocation(MAP_COUNT_OFFSET)),
            SEED_UNIFORM => Some(UniformLocation(SEED_OFFSET)),
            _ => None,
        }
    }

    fn set_matrices(&mut self, location: UniformLocation, matrices: &[Mat4]) -> Result<()> {
        self.write_uniform_bytes(location.0, bytemuck::cast_slice(matrices))
    }

    fn set_u32(&mut self, location: UniformLocation, value: u32) -> Result<()> {
        self.write_uniform_bytes(location.0, bytemuck::bytes_of(&value))
    }

    fn dispatch(&mut self, invocations: u32) -> Result<()> {
        if invocations != self.uniforms.point_count {
            return Err(Error::Gpu(format!(
                "dispatch of {} invocations over {} uploaded points",
                invocations, self.uniforms.point_count
            )));
        }
        self.flush_uniforms();
        let bind_group = match self.points {
            Some((_, ref bind_group)) => bind_group,
            None => return Err(Error::Gpu("no points uploaded".to_string())),
        };

        let groups = (invocations + WORKGROUP_SIZE - 1) / WORKGROUP_SIZE;
        let groups_x = groups.min(MAX_GROUPS_PER_DIMENSION).max(1);
        let groups_y = (groups + groups_x - 1) / groups_x;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("chaos round") });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("chaos round"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.dispatch_workgroups(groups_x, groups_y, 1);
        }
        self.recorded.push(encoder.finish());
        Ok(())
    }

    fn memory_barrier(&mut self, barrier: Barrier) -> Result<()> {
        trace!("barrier {:?} after {} recorded rounds", barrier, self.recorded.len());
        self.submit();
        Ok(())
    }
}
