// Library side of the immofuse binary: the end-to-end pipeline, usable from tests.

pub mod pipeline;
