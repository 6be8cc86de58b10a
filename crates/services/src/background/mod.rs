pub mod invitation_sweeper;

pub use invitation_sweeper::InvitationSweeper;
