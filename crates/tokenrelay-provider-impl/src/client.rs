/// Builds the outbound client, routed through `proxy` when one is set.
///
/// The client owns the connection pool and is meant to be built once and
/// shared by every request.
pub fn build_client(proxy: Option<&str>) -> Result<wreq::Client, wreq::Error> {
    let mut builder = wreq::Client::builder();
    if let Some(proxy) = proxy.map(str::trim).filter(|proxy| !proxy.is_empty()) {
        builder = builder.proxy(wreq::Proxy::all(proxy)?);
    }
    builder.build()
}
