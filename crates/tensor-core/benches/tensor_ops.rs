// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for tensor kernels and parameter dictionary encoding.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tensor_core::{binary, matmul, BinaryOp, ParamDict, Shape, Tensor};

fn bench_matmul(c: &mut Criterion) {
    let a = Tensor::full_f32(Shape::matrix(64, 64), 0.5);
    let b = Tensor::full_f32(Shape::matrix(64, 64), 2.0);
    c.bench_function("matmul_64x64", |bench| {
        bench.iter(|| matmul(black_box(&a.view()), black_box(&b.view())).unwrap())
    });
}

fn bench_add(c: &mut Criterion) {
    let a = Tensor::full_f32(Shape::matrix(256, 256), 1.0);
    let b = Tensor::full_f32(Shape::matrix(256, 256), 2.0);
    c.bench_function("add_256x256", |bench| {
        bench.iter(|| binary(BinaryOp::Add, black_box(&a.view()), black_box(&b.view())).unwrap())
    });
}

fn bench_params_encode(c: &mut Criterion) {
    let dict: ParamDict = (0..16)
        .map(|i| (format!("p{i}"), Tensor::full_f32(Shape::matrix(128, 128), i as f32)))
        .collect();
    c.bench_function("param_dict_encode_decode", |bench| {
        bench.iter(|| {
            let bytes = dict.to_bytes().unwrap();
            ParamDict::from_bytes(black_box(&bytes)).unwrap()
        })
    });
}

criterion_group!(benches, bench_matmul, bench_add, bench_params_encode);
criterion_main!(benches);
