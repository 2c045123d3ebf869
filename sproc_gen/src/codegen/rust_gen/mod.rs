pub mod aggregate;
pub mod dao;
pub mod helpers;
pub mod mapper;
pub mod unpack;
pub mod wrapper;

pub use aggregate::emit_aggregate;
pub use dao::{DaoEmitter, EmitContext};
pub use mapper::{MapperSpec, emit_mapper};
pub use unpack::{CallSite, render_body};
pub use wrapper::emit_wrapper;
