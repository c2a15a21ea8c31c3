use log::debug;

use crate::dom::Dom;
use crate::reveal;
use crate::runtime::{PageContext, PageScript};

/// Course cards fade up as the grid scrolls in; each card's details
/// collapse independently.
pub struct AcademicsPage;

impl<D: Dom + 'static> PageScript<D> for AcademicsPage {
    fn init(&mut self, ctx: &PageContext<D>) {
        let config = &ctx.config.academics;
        let revealed = reveal::reveal(ctx, &config.reveal);
        let collapsibles = reveal::collapsibles(ctx, &config.collapsible);
        debug!("academics: {revealed} cards revealed, {collapsibles} collapsible");
    }
}
