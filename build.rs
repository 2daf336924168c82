fn main() -> Result<(), Box<dyn std::error::Error>> {
	let cargo = vergen_gitcl::CargoBuilder::all_cargo()?;
	let gitcl = vergen_gitcl::GitclBuilder::all_git()?;

	vergen_gitcl::Emitter::default()
		.add_instructions(&cargo)?
		.add_instructions(&gitcl)?
		.emit()?;

	Ok(())
}
