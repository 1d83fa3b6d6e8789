//! Types shared by the reference exports.

use seam_callback::checked_status;
use seam_core::{BoundaryError, StatusCode};

/// Status and error code of every reference export.
///
/// `Ok`, `Null` and `Panic` are reserved by the boundary; domain errors
/// follow.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Ok = 0,
    Null = 100,
    Panic = 200,
    Fail = 300,
}

impl BoundaryError for ErrorCode {
    const PANIC: Self = ErrorCode::Panic;
    const NULL: Self = ErrorCode::Null;
}

impl StatusCode for ErrorCode {
    const SUCCESS: Self = ErrorCode::Ok;
}

checked_status!(ErrorCode);

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3f32 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3f32 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Vec3f32 { x, y, z }
    }
}

/// Tagged enum with payloads; the tag is a leading `u32`.
#[repr(C, u32)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnumPayload {
    A,
    B(Vec3f32),
    C(u32),
}
