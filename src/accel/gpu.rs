//! GPU execution of aggregate batches via wgpu (Metal on macOS, Vulkan on
//! Linux/Windows).
//!
//! One workgroup runs one invocation; its invocations are the lanes and
//! `var<workgroup>` memory holds `neu1`/`neu1e`. A whole batch is a single
//! dispatch, so invocations touching the same rows race exactly like lane
//! groups on the CPU.
//!
//! Every batch uploads the matrices and reads them back. The path pays off
//! only for batches large enough to amortize the transfers.

use super::shaders::{self, LANES, MAX_VECTOR_LENGTH};
use crate::aggregate::Aggregate;
use crate::tables::Tables;
use crate::weights::Weights;
use log::debug;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during GPU operations.
#[derive(Debug, Clone, Error)]
pub enum GpuError {
    /// No GPU adapter found
    #[error("No GPU adapter found")]
    NoAdapter,
    /// Failed to create device
    #[error("Device creation failed: {0}")]
    DeviceCreation(String),
    /// Buffer mapping failed
    #[error("Buffer mapping failed: {0}")]
    BufferMapping(String),
    /// The batch does not fit the shader's limits
    #[error("Unsupported workload: {0}")]
    Unsupported(String),
}

impl From<GpuError> for crate::error::AggregateError {
    fn from(err: GpuError) -> Self {
        crate::error::AggregateError::Gpu(err.to_string())
    }
}

/// Per-workgroup header, mirrored by `Invocation` in the shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InvocationHeader {
    kind: u32,
    word: u32,
    context_offset: u32,
    context_len: u32,
    path_offset: u32,
    path_len: u32,
    rounds: u32,
    starter: u32,
    seed_lo: u32,
    seed_hi: u32,
    alpha: f32,
    _padding: u32,
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Params {
    vector_length: u32,
    vocab_size: u32,
    exp_len: u32,
    neg_len: u32,
    batch_len: u32,
    groups_x: u32,
    _padding0: u32,
    _padding1: u32,
}

const KIND_SKIPGRAM: u32 = 0;
const KIND_CBOW: u32 = 1;

fn to_u32(value: usize, what: &str) -> Result<u32, GpuError> {
    u32::try_from(value).map_err(|_| GpuError::Unsupported(format!("{what} {value} exceeds u32")))
}

/// Flattens descriptors into shader headers plus one shared index pool.
///
/// The pool holds, per invocation, its context rows followed by its HS nodes
/// and then its HS codes.
pub fn encode_batch(batch: &[Aggregate]) -> Result<(Vec<InvocationHeader>, Vec<u32>), GpuError> {
    let mut headers = Vec::with_capacity(batch.len());
    let mut indices = Vec::new();

    for op in batch {
        let mut header = InvocationHeader::default();
        match op {
            Aggregate::SkipGram(op) => {
                header.kind = KIND_SKIPGRAM;
                header.word = to_u32(op.word, "word")?;
            }
            Aggregate::Cbow(op) => {
                header.kind = KIND_CBOW;
                header.context_offset = to_u32(indices.len(), "index pool")?;
                header.context_len = to_u32(op.context.len(), "context length")?;
                for &row in &op.context {
                    indices.push(to_u32(row, "context row")?);
                }
            }
        }

        let path = op.path();
        header.path_offset = to_u32(indices.len(), "index pool")?;
        header.path_len = to_u32(path.len(), "path length")?;
        for &node in &path.nodes {
            indices.push(to_u32(node, "syn1 row")?);
        }
        indices.extend(path.codes.iter().map(|&code| code as u32));

        let negative = op.negative();
        header.rounds = to_u32(negative.rounds, "negative rounds")?;
        header.starter = to_u32(negative.starter, "starter")?;
        header.seed_lo = negative.seed as u32;
        header.seed_hi = (negative.seed >> 32) as u32;
        header.alpha = op.alpha();

        headers.push(header);
    }

    Ok((headers, indices))
}

/// GPU accelerator for aggregate batches.
///
/// This struct owns the device and the compiled pipeline; buffers are
/// created per batch.
pub struct GpuAccelerator {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    /// Maximum storage buffer binding size in bytes
    max_buffer_binding_size: u64,
    max_workgroups_per_dimension: u32,
}

impl GpuAccelerator {
    /// Check if GPU acceleration is available.
    pub fn is_available() -> bool {
        pollster::block_on(Self::is_available_async())
    }

    /// Check if GPU acceleration is available (async).
    async fn is_available_async() -> bool {
        let instance = wgpu::Instance::default();
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .is_some()
    }

    /// Create a new GPU accelerator.
    pub fn new() -> Result<Self, GpuError> {
        pollster::block_on(Self::new_async())
    }

    /// Create a new GPU accelerator (async).
    async fn new_async() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::VULKAN | wgpu::Backends::METAL | wgpu::Backends::DX12,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let adapter_limits = adapter.limits();

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Aggregate GPU Accelerator"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter_limits.clone(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e: wgpu::RequestDeviceError| GpuError::DeviceCreation(e.to_string()))?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Aggregate Shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::AGGREGATE_SHADER.into()),
        });

        let storage = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Aggregate Bind Group Layout"),
            entries: &[
                storage(0, false),
                storage(1, false),
                storage(2, false),
                storage(3, true),
                storage(4, true),
                storage(5, true),
                storage(6, true),
                wgpu::BindGroupLayoutEntry {
                    binding: 7,
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
            label: Some("Aggregate Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Aggregate Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            pipeline,
            bind_group_layout,
            max_buffer_binding_size: adapter_limits.max_storage_buffer_binding_size as u64,
            max_workgroups_per_dimension: adapter_limits.max_compute_workgroups_per_dimension,
        })
    }

    /// Returns the maximum buffer binding size in bytes.
    pub fn max_buffer_binding_size(&self) -> u64 {
        self.max_buffer_binding_size
    }

    /// Runs a validated batch, updating the matrices in place.
    pub fn run_batch(&self, weights: &mut Weights<'_>, tables: &Tables<'_>, batch: &[Aggregate]) -> Result<(), GpuError> {
        if batch.is_empty() {
            return Ok(());
        }
        pollster::block_on(self.run_batch_async(weights, tables, batch))
    }

    fn check_binding(&self, what: &str, len: usize) -> Result<(), GpuError> {
        let bytes = (len * std::mem::size_of::<f32>()) as u64;
        if bytes > self.max_buffer_binding_size {
            return Err(GpuError::Unsupported(format!(
                "{what} needs {bytes} bytes, binding limit is {}",
                self.max_buffer_binding_size
            )));
        }
        to_u32(len, what).map(|_| ())
    }

    /// Creates a storage buffer holding `contents`. Empty contents get one
    /// zero word, since bindings cannot be empty.
    fn storage_buffer(&self, label: &str, contents: &[u8], extra_usage: wgpu::BufferUsages) -> wgpu::Buffer {
        const EMPTY: [u8; 4] = [0; 4];
        let contents = if contents.is_empty() { &EMPTY[..] } else { contents };
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: contents.len() as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | extra_usage,
            mapped_at_creation: false,
        });
        self.queue.write_buffer(&buffer, 0, contents);
        buffer
    }

    async fn run_batch_async(
        &self,
        weights: &mut Weights<'_>,
        tables: &Tables<'_>,
        batch: &[Aggregate],
    ) -> Result<(), GpuError> {
        let layout = weights.layout();
        if layout.vector_length > MAX_VECTOR_LENGTH {
            return Err(GpuError::Unsupported(format!(
                "vector_length {} exceeds {MAX_VECTOR_LENGTH}",
                layout.vector_length
            )));
        }
        self.check_binding("syn0", weights.syn0.len())?;
        self.check_binding("exp_table", tables.exp.len())?;

        let (headers, indices) = encode_batch(batch)?;
        let neg_entries: &[i32] = match &tables.neg {
            Some(table) => table.as_slice(),
            None => &[0],
        };

        let batch_len = to_u32(batch.len(), "batch length")?;
        let groups_x = batch_len.min(self.max_workgroups_per_dimension.max(1));
        let groups_y = batch_len.div_ceil(groups_x);
        if groups_y > self.max_workgroups_per_dimension {
            return Err(GpuError::Unsupported(format!("batch of {batch_len} exceeds dispatch limits")));
        }

        let params = Params {
            vector_length: to_u32(layout.vector_length, "vector_length")?,
            vocab_size: to_u32(layout.vocab_size, "vocab_size")?,
            exp_len: to_u32(tables.exp.len(), "exp_table")?,
            neg_len: to_u32(neg_entries.len(), "neg_table")?,
            batch_len,
            groups_x,
            _padding0: 0,
            _padding1: 0,
        };

        debug!(
            "GPU batch: {} invocations, {} workgroups ({}x{}) of {} lanes",
            batch.len(),
            groups_x * groups_y,
            groups_x,
            groups_y,
            LANES
        );

        let readable = wgpu::BufferUsages::COPY_SRC;
        let syn0_buffer = self.storage_buffer("syn0", bytemuck::cast_slice(&weights.syn0[..]), readable);
        let syn1_buffer = self.storage_buffer("syn1", bytemuck::cast_slice(&weights.syn1[..]), readable);
        let syn1_neg_buffer = self.storage_buffer("syn1_neg", bytemuck::cast_slice(&weights.syn1_neg[..]), readable);
        let none = wgpu::BufferUsages::empty();
        let exp_buffer = self.storage_buffer("exp_table", bytemuck::cast_slice(tables.exp.as_slice()), none);
        let neg_buffer = self.storage_buffer("neg_table", bytemuck::cast_slice(neg_entries), none);
        let header_buffer = self.storage_buffer("invocations", bytemuck::cast_slice(&headers), none);
        let index_buffer = self.storage_buffer("indices", bytemuck::cast_slice(&indices), none);

        let params_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Aggregate Params"),
            size: std::mem::size_of::<Params>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.queue.write_buffer(&params_buffer, 0, bytemuck::bytes_of(&params));

        let buffers = [
            &syn0_buffer,
            &syn1_buffer,
            &syn1_neg_buffer,
            &exp_buffer,
            &neg_buffer,
            &header_buffer,
            &index_buffer,
            &params_buffer,
        ];
        let entries: Vec<wgpu::BindGroupEntry<'_>> = buffers
            .iter()
            .enumerate()
            .map(|(binding, buffer)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: buffer.as_entire_binding(),
            })
            .collect();

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Aggregate Bind Group"),
            layout: &self.bind_group_layout,
            entries: &entries,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Aggregate Encoder"),
        });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Aggregate Pass"),
                timestamp_writes: None,
            });

            compute_pass.set_pipeline(&self.pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.dispatch_workgroups(groups_x, groups_y, 1);
        }

        let staging = [
            self.stage(&mut encoder, &syn0_buffer, weights.syn0.len(), "syn0 Staging"),
            self.stage(&mut encoder, &syn1_buffer, weights.syn1.len(), "syn1 Staging"),
            self.stage(&mut encoder, &syn1_neg_buffer, weights.syn1_neg.len(), "syn1_neg Staging"),
        ];

        self.queue.submit(Some(encoder.finish()));

        let [syn0_staging, syn1_staging, syn1_neg_staging] = staging;
        self.read_back(syn0_staging, weights.syn0).await?;
        self.read_back(syn1_staging, weights.syn1).await?;
        self.read_back(syn1_neg_staging, weights.syn1_neg).await?;

        Ok(())
    }

    /// Queues a copy of the first `len` floats of `source` into a mappable
    /// buffer, or returns `None` for an empty matrix.
    fn stage(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        source: &wgpu::Buffer,
        len: usize,
        label: &str,
    ) -> Option<wgpu::Buffer> {
        if len == 0 {
            return None;
        }
        let size = (len * std::mem::size_of::<f32>()) as u64;
        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        encoder.copy_buffer_to_buffer(source, 0, &staging_buffer, 0, size);
        Some(staging_buffer)
    }

    async fn read_back(&self, staging_buffer: Option<wgpu::Buffer>, target: &mut [f32]) -> Result<(), GpuError> {
        let Some(staging_buffer) = staging_buffer else {
            return Ok(());
        };

        let buffer_slice = staging_buffer.slice(..);
        let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            sender.send(result).ok();
        });

        self.device.poll(wgpu::Maintain::Wait);

        receiver
            .receive()
            .await
            .ok_or_else(|| GpuError::BufferMapping("Channel receive failed".to_string()))?
            .map_err(|e| GpuError::BufferMapping(format!("{:?}", e)))?;

        {
            let data = buffer_slice.get_mapped_range();
            let updated: &[f32] = bytemuck::cast_slice(&data);
            target.copy_from_slice(updated);
        }

        staging_buffer.unmap();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Cbow, HsPath, NegativeRounds, Scratch, SkipGram};
    use crate::tables::{sigmoid_table, ExpTable, NegTable};

    #[test]
    fn test_gpu_available() {
        // Just test that is_available doesn't panic
        let _available = GpuAccelerator::is_available();
    }

    #[test]
    fn test_encode_batch_layout() {
        let batch: Vec<Aggregate> = vec![
            SkipGram::new(4, 0.5)
                .with_path(HsPath::new(vec![7, 8], vec![1, 0]))
                .with_negative(NegativeRounds::new(3, 2, (9u64 << 32) | 5))
                .into(),
            Cbow::new(vec![1, 2, 3], 0.25).into(),
        ];

        let (headers, indices) = encode_batch(&batch).unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(indices, vec![7, 8, 1, 0, 1, 2, 3]);

        assert_eq!(headers[0].kind, KIND_SKIPGRAM);
        assert_eq!(headers[0].word, 4);
        assert_eq!(headers[0].path_offset, 0);
        assert_eq!(headers[0].path_len, 2);
        assert_eq!(headers[0].seed_lo, 5);
        assert_eq!(headers[0].seed_hi, 9);

        assert_eq!(headers[1].kind, KIND_CBOW);
        assert_eq!(headers[1].context_offset, 4);
        assert_eq!(headers[1].context_len, 3);
        assert_eq!(headers[1].path_offset, 7);
        assert_eq!(headers[1].path_len, 0);
        assert_eq!(headers[1].alpha, 0.25);
    }

    #[test]
    fn test_matches_sequential() {
        if !GpuAccelerator::is_available() {
            eprintln!("GPU not available, skipping test");
            return;
        }

        let gpu = GpuAccelerator::new().expect("Failed to create GPU accelerator");

        let (vocab, vl) = (16, 70);
        let init = |salt: usize| -> Vec<f32> {
            (0..vocab * vl)
                .map(|i| (((i * 37 + salt * 11) % 29) as f32 - 14.0) * 0.01)
                .collect()
        };
        let exp_values = sigmoid_table(1000);
        let neg_entries: Vec<i32> = (0..128).map(|i| i % 16).collect();
        let tables = Tables::new(
            ExpTable::new(&exp_values).unwrap(),
            NegTable::new(&neg_entries).unwrap(),
        );

        // A single invocation, so no cross-workgroup races.
        let batch: Vec<Aggregate> = vec![Cbow::new(vec![1, 5, 9], 0.05)
            .with_path(HsPath::new(vec![0, 3, 6], vec![1, 1, 0]))
            .with_negative(NegativeRounds::new(5, 2, 0xDEAD_BEEF_1234))
            .into()];

        let (mut e0, mut e1, mut en) = (init(1), init(2), init(3));
        {
            let mut weights = Weights::new(&mut e0, &mut e1, &mut en, vl).unwrap();
            let mut scratch = Scratch::new(vl);
            batch[0].run(&mut weights, &tables, &mut scratch);
        }

        let (mut g0, mut g1, mut gn) = (init(1), init(2), init(3));
        {
            let mut weights = Weights::new(&mut g0, &mut g1, &mut gn, vl).unwrap();
            gpu.run_batch(&mut weights, &tables, &batch).expect("run_batch failed");
        }

        for (a, b) in g0.iter().chain(&g1).chain(&gn).zip(e0.iter().chain(&e1).chain(&en)) {
            assert!((a - b).abs() < 1e-4, "{a} vs {b}");
        }
    }
}
