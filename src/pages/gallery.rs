use crate::dom::Dom;
use crate::reveal;
use crate::runtime::{PageContext, PageScript};

/// Every gallery item reveals on its own crossing; images zoom on hover.
pub struct GalleryPage;

impl<D: Dom + 'static> PageScript<D> for GalleryPage {
    fn init(&mut self, ctx: &PageContext<D>) {
        let config = &ctx.config.gallery;
        reveal::reveal(ctx, &config.reveal);
        reveal::hovers(ctx, &config.hover);
    }
}
