use log::debug;

use crate::dom::Dom;
use crate::reveal;
use crate::runtime::{PageContext, PageScript};

pub struct MembersPage;

impl<D: Dom + 'static> PageScript<D> for MembersPage {
    fn init(&mut self, ctx: &PageContext<D>) {
        let config = &ctx.config.members;
        let revealed = reveal::reveal(ctx, &config.reveal);
        reveal::hovers(ctx, &config.hover);
        let buttons = reveal::filters(ctx, &config.filter);
        debug!("members: {revealed} cards, {buttons} filter buttons");
    }
}
