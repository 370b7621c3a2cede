#![allow(non_camel_case_types)]
use duplicate::duplicate_item;

pub type float = f64;
pub type int = i64;
pub type uint = usize;

#[duplicate_item(
    trait_name type_name;
    [CCfloat] [float];
    [CCint] [int];
    [CCuint] [uint];
)]
pub trait trait_name {
    fn type_name(&self) -> type_name;
}

// CCfloat
#[duplicate_item(
    type_name;
    [ i32 ];
    [ i64 ];
    [ u32 ];
    [ u64 ];
    [ usize ];
    [ f32 ];
    [ f64 ];
)]
impl CCfloat for type_name {
    fn float(&self) -> float {
        (*self) as float
    }
}

// CCint
#[duplicate_item(
    type_name;
    [ i32 ];
    [ i64 ];
    [ usize ];
    [ f64 ];
)]
impl CCint for type_name {
    fn int(&self) -> int {
        (*self) as int
    }
}

// CCuint, negative values saturate at zero
#[duplicate_item(
    type_name;
    [ i32 ];
    [ i64 ];
    [ u64 ];
    [ usize ];
    [ f64 ];
)]
impl CCuint for type_name {
    fn uint(&self) -> uint {
        (*self) as uint
    }
}
