//! Pure mapping between the external kernel payload/view model and the
//! JSON shape of the Kubernetes `Kernel` custom resource. No I/O.

mod cr;
mod types;

pub use cr::{CrNames, SchemaMappingError, cr_to_view, payload_to_cr};
pub use types::{
    ConnectionInfo, CreateKernelRequest, DeleteKernelsRequest, KernelPayload, KernelResponse,
    KernelSpecName, KernelView, DEFAULT_KERNEL_IMAGE,
};
