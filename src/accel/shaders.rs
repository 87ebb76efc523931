//! WGSL compute shaders for the accelerator path.

/// Workgroup size of [`AGGREGATE_SHADER`]; the lanes of one invocation.
pub const LANES: u32 = 64;

/// Largest `vector_length` the workgroup scratch arrays can hold.
pub const MAX_VECTOR_LENGTH: usize = 1024;

/// Fused SkipGram/CBOW aggregate, one workgroup per invocation.
///
/// Algorithm per workgroup:
/// 1. Load the embedding side into `neu1` (the `syn0` row for SkipGram, the
///    averaged context for CBOW) and zero `neu1e`
/// 2. Loop: lane 0 publishes the next round (HS node, positive target or
///    drawn negative), every lane adds its strided partial dot product into
///    `dot_acc`, lane 0 publishes `g` or a skip, every lane applies the two
///    axpy updates on its strided elements
/// 3. Add `neu1e` to the `syn0` row(s)
///
/// The 64-bit `next_random` state is emulated with `(lo, hi)` pairs of `u32`.
/// `f32` atomics do not exist in WGSL, so the dot accumulator is an
/// `atomic<u32>` updated by a compare-exchange loop on the float bits.
///
/// Inputs:
/// - syn0, syn1, syn1_neg: row-major matrices, updated in place
/// - exp_table, neg_table: lookup tables (neg_table holds one dummy entry
///   when negative sampling is unused)
/// - invocations: one header per workgroup
/// - indices: context rows, HS nodes and HS codes referenced by the headers
/// - params: { vector_length, vocab_size, exp_len, neg_len, batch_len, groups_x }
pub const AGGREGATE_SHADER: &str = r#"
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

struct Invocation {
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

@group(0) @binding(0) var<storage, read_write> syn0: array<f32>;
@group(0) @binding(1) var<storage, read_write> syn1: array<f32>;
@group(0) @binding(2) var<storage, read_write> syn1_neg: array<f32>;
@group(0) @binding(3) var<storage, read> exp_table: array<f32>;
@group(0) @binding(4) var<storage, read> neg_table: array<i32>;
@group(0) @binding(5) var<storage, read> invocations: array<Invocation>;
@group(0) @binding(6) var<storage, read> indices: array<u32>;
@group(0) @binding(7) var<uniform> params: Params;

const LANES: u32 = 64u;
const MAX_VECTOR_LENGTH: u32 = 1024u;
const MAX_EXP: f32 = 6.0;
const DRAW_BUDGET: u32 = 32u;

// 25214903917 = 0x5_DEECE66D
const LCG_MUL_LO: u32 = 0xDEECE66Du;
const LCG_MUL_HI: u32 = 0x5u;
const LCG_INC: u32 = 11u;

const KIND_SKIPGRAM: u32 = 0u;

const ROUND_DONE: u32 = 0u;
const ROUND_HIERARCHIC: u32 = 1u;
const ROUND_NEGATIVE: u32 = 2u;

var<workgroup> neu1: array<f32, MAX_VECTOR_LENGTH>;
var<workgroup> neu1e: array<f32, MAX_VECTOR_LENGTH>;
var<workgroup> dot_acc: atomic<u32>;
var<workgroup> round_kind: u32;
var<workgroup> round_row: u32;
var<workgroup> round_code: u32;
var<workgroup> round_g: f32;
var<workgroup> round_skip: u32;

// Round source, only touched by lane 0.
var<private> rng_lo: u32;
var<private> rng_hi: u32;
var<private> hs_next: u32;
var<private> positive_pending: bool;
var<private> negatives_left: u32;
var<private> draws_left: u32;

// High 32 bits of a 32x32-bit product.
fn mul_hi(a: u32, b: u32) -> u32 {
    let a_lo = a & 0xFFFFu;
    let a_hi = a >> 16u;
    let b_lo = b & 0xFFFFu;
    let b_hi = b >> 16u;
    let lo_lo = a_lo * b_lo;
    let hi_lo = a_hi * b_lo;
    let lo_hi = a_lo * b_hi;
    let hi_hi = a_hi * b_hi;
    let cross = (lo_lo >> 16u) + (hi_lo & 0xFFFFu) + lo_hi;
    return hi_hi + (hi_lo >> 16u) + (cross >> 16u);
}

// next = next * 25214903917 + 11 (mod 2^64)
fn lcg_advance() {
    let lo = rng_lo * LCG_MUL_LO;
    var hi = mul_hi(rng_lo, LCG_MUL_LO) + rng_lo * LCG_MUL_HI + rng_hi * LCG_MUL_LO;
    let sum = lo + LCG_INC;
    if (sum < lo) {
        hi = hi + 1u;
    }
    rng_lo = sum;
    rng_hi = hi;
}

// (hi * 2^32 + lo) % m by shift-subtract over the low word.
fn mod64(lo: u32, hi: u32, m: u32) -> u32 {
    var r = hi % m;
    for (var i = 0u; i < 32u; i++) {
        let top = r >> 31u;
        r = (r << 1u) | ((lo >> (31u - i)) & 1u);
        if (top == 1u || r >= m) {
            r = r - m;
        }
    }
    return r;
}

fn draw_target() -> u32 {
    let shifted_lo = (rng_lo >> 16u) | (rng_hi << 16u);
    let shifted_hi = rng_hi >> 16u;
    let entry = neg_table[mod64(shifted_lo, shifted_hi, params.neg_len)];
    if (entry <= 0 || u32(entry) >= params.vocab_size) {
        return mod64(rng_lo, rng_hi, params.vocab_size - 1u) + 1u;
    }
    return u32(entry);
}

fn rounds_start(inv: Invocation) {
    rng_lo = inv.seed_lo;
    rng_hi = inv.seed_hi;
    hs_next = 0u;
    positive_pending = inv.rounds > 0u;
    negatives_left = inv.rounds;
    draws_left = inv.rounds * DRAW_BUDGET;
}

fn publish_next(inv: Invocation) {
    if (hs_next < inv.path_len) {
        round_kind = ROUND_HIERARCHIC;
        round_row = indices[inv.path_offset + hs_next];
        round_code = indices[inv.path_offset + inv.path_len + hs_next];
        hs_next = hs_next + 1u;
        return;
    }
    if (positive_pending) {
        positive_pending = false;
        round_kind = ROUND_NEGATIVE;
        round_row = inv.starter;
        round_code = 1u;
        return;
    }
    loop {
        if (negatives_left == 0u || draws_left == 0u) {
            break;
        }
        draws_left = draws_left - 1u;
        lcg_advance();
        let row = draw_target();
        if (row == inv.starter) {
            continue;
        }
        negatives_left = negatives_left - 1u;
        round_kind = ROUND_NEGATIVE;
        round_row = row;
        round_code = 0u;
        return;
    }
    round_kind = ROUND_DONE;
}

fn bucket(dot: f32) -> u32 {
    return u32((dot + MAX_EXP) * (f32(params.exp_len) / MAX_EXP / 2.0));
}

fn publish_gradient(kind: u32, dot: f32, alpha: f32) {
    let label = f32(round_code);
    var g = 0.0;
    var skip = 0u;
    if (kind == ROUND_HIERARCHIC) {
        if (dot < -MAX_EXP || dot >= MAX_EXP) {
            skip = 1u;
        } else {
            let idx = bucket(dot);
            if (idx >= params.exp_len) {
                skip = 1u;
            } else {
                g = (1.0 - label - exp_table[idx]) * alpha;
            }
        }
    } else if (dot > MAX_EXP) {
        g = (label - 1.0) * alpha;
    } else if (dot < -MAX_EXP) {
        g = label * alpha;
    } else {
        let idx = bucket(dot);
        if (idx >= params.exp_len) {
            skip = 1u;
        } else {
            g = (label - exp_table[idx]) * alpha;
        }
    }
    round_g = g;
    round_skip = skip;
}

fn target_load(kind: u32, idx: u32) -> f32 {
    if (kind == ROUND_HIERARCHIC) {
        return syn1[idx];
    }
    return syn1_neg[idx];
}

fn target_add(kind: u32, idx: u32, value: f32) {
    if (kind == ROUND_HIERARCHIC) {
        syn1[idx] = syn1[idx] + value;
    } else {
        syn1_neg[idx] = syn1_neg[idx] + value;
    }
}

fn atomic_add_f32(value: f32) {
    var old = atomicLoad(&dot_acc);
    loop {
        let next = bitcast<u32>(bitcast<f32>(old) + value);
        let result = atomicCompareExchangeWeak(&dot_acc, old, next);
        if (result.exchanged) {
            break;
        }
        old = result.old_value;
    }
}

@compute @workgroup_size(64)
fn main(
    @builtin(local_invocation_id) local_id: vec3<u32>,
    @builtin(workgroup_id) group_id: vec3<u32>
) {
    let lane = local_id.x;
    let index = group_id.y * params.groups_x + group_id.x;
    if (index >= params.batch_len) {
        return;
    }

    let inv = invocations[index];
    let vl = params.vector_length;

    for (var i = lane; i < vl; i += LANES) {
        var value = 0.0;
        if (inv.kind == KIND_SKIPGRAM) {
            value = syn0[inv.word * vl + i];
        } else {
            for (var c = 0u; c < inv.context_len; c++) {
                value = value + syn0[indices[inv.context_offset + c] * vl + i];
            }
            if (inv.context_len > 0u) {
                value = value / f32(inv.context_len);
            }
        }
        neu1[i] = value;
        neu1e[i] = 0.0;
    }
    if (lane == 0u) {
        rounds_start(inv);
    }
    workgroupBarrier();

    loop {
        if (lane == 0u) {
            publish_next(inv);
            atomicStore(&dot_acc, 0u);
        }
        let kind = workgroupUniformLoad(&round_kind);
        if (kind == ROUND_DONE) {
            break;
        }
        let base = round_row * vl;

        var partial = 0.0;
        for (var i = lane; i < vl; i += LANES) {
            partial = partial + neu1[i] * target_load(kind, base + i);
        }
        atomic_add_f32(partial);
        workgroupBarrier();

        if (lane == 0u) {
            publish_gradient(kind, bitcast<f32>(atomicLoad(&dot_acc)), inv.alpha);
        }
        let skip = workgroupUniformLoad(&round_skip);
        if (skip == 0u) {
            let g = round_g;
            for (var i = lane; i < vl; i += LANES) {
                neu1e[i] = neu1e[i] + g * target_load(kind, base + i);
                target_add(kind, base + i, g * neu1[i]);
            }
        }
        workgroupBarrier();
    }

    for (var i = lane; i < vl; i += LANES) {
        let delta = neu1e[i];
        if (inv.kind == KIND_SKIPGRAM) {
            syn0[inv.word * vl + i] = syn0[inv.word * vl + i] + delta;
        } else {
            for (var c = 0u; c < inv.context_len; c++) {
                let idx = indices[inv.context_offset + c] * vl + i;
                syn0[idx] = syn0[idx] + delta;
            }
        }
    }
}
"#;
