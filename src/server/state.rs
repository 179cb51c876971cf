use crate::pipeline::CardPipeline;
use crate::providers::Provider;

pub(crate) struct ServerState<P: Provider> {
    pub(crate) pipeline: CardPipeline<P>,
}
