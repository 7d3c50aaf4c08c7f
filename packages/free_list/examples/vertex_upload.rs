//! Example of keeping vertex data in a `FreeList` and uploading it region by region.
//!
//! Shapes are inserted as contiguous runs of vertices and removed again as the scene changes.
//! Each frame, the live vertices are handed over as a handful of slices, one per run of
//! occupied slots, instead of one call per vertex.
//!
//! Run with `RUST_LOG=free_list=trace` to see the free list grow and recycle slots.

use free_list::FreeList;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, Default)]
struct Vertex {
    position: [f32; 2],
    color: [f32; 4],
}

fn quad(x: f32, y: f32, color: [f32; 4]) -> [Vertex; 4] {
    [
        Vertex {
            position: [x, y],
            color,
        },
        Vertex {
            position: [x + 1.0, y],
            color,
        },
        Vertex {
            position: [x + 1.0, y + 1.0],
            color,
        },
        Vertex {
            position: [x, y + 1.0],
            color,
        },
    ]
}

/// Stands in for copying a slice into a GPU vertex buffer at the given offset.
fn upload(offset: usize, vertices: &[Vertex]) {
    println!(
        "  upload {} vertices to offset {offset} (first: {:?})",
        vertices.len(),
        vertices.first().map(|vertex| (vertex.position, vertex.color))
    );
}

fn upload_frame(frame: usize, vertices: &FreeList<Vertex>) {
    println!(
        "Frame {frame}: {} live vertices in {} slots",
        vertices.len(),
        vertices.capacity()
    );

    for (offset, run) in vertices.regions() {
        upload(offset, run);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut vertices = FreeList::<Vertex>::new();

    let red = vertices.push_slice(&quad(0.0, 0.0, [1.0, 0.0, 0.0, 1.0]));
    let green = vertices.push_slice(&quad(2.0, 0.0, [0.0, 1.0, 0.0, 1.0]));
    let blue = vertices.push_slice(&quad(4.0, 0.0, [0.0, 0.0, 1.0, 1.0]));

    upload_frame(0, &vertices);

    // Removing the middle quad leaves a hole, so the frame is uploaded in two regions.
    vertices.erase(green, 4);
    upload_frame(1, &vertices);

    // A new quad fits exactly into the hole left by the removed one.
    let yellow = vertices.push_slice(&quad(2.0, 2.0, [1.0, 1.0, 0.0, 1.0]));
    assert_eq!(yellow, green);
    upload_frame(2, &vertices);

    // Animate every vertex in place.
    for (_, run) in vertices.regions_mut() {
        for vertex in run {
            vertex.position[1] += 0.5;
        }
    }

    vertices.erase(red, 4);
    vertices.erase(blue, 4);
    upload_frame(3, &vertices);

    vertices.clear();
    vertices.shrink_to_fit();
    println!("Released all vertex storage, capacity is {}", vertices.capacity());
}
