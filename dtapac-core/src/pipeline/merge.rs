use futures::{Stream, StreamExt, stream::BoxStream};

/// Fan-in over any number of sources.
///
/// Every item is yielded exactly once and each source keeps its own order;
/// there is no ordering across sources. The merged stream ends after every
/// input has ended. A single input is returned as is.
pub fn merge<S, T>(mut inputs: Vec<S>) -> BoxStream<'static, T>
where
    S: Stream<Item = T> + Send + Unpin + 'static,
    T: Send + 'static,
{
    if inputs.len() == 1
        && let Some(only) = inputs.pop()
    {
        return only.boxed();
    }
    futures::stream::select_all(inputs).boxed()
}
